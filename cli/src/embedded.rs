// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

//! In-process service wiring
//!
//! Builds one explicit set of coordinator services from the node
//! configuration. Whatever hosts the engine (the operator CLI, a WebSocket
//! server) owns a `HiveServices` and hands references to it to every call
//! site; there is no process-global coordinator.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use hivemind_core::{
    application::{
        repository_factory::create_command_record_repository, CoordinationTable, ExecutionGateway,
        ResultStore,
    },
    domain::{node_config::NodeConfigManifest, repository::StorageBackend},
    infrastructure::{
        db::Database, repositories::postgres_command::PostgresCommandRecordRepository, EventBus,
        ToolRegistry,
    },
};
use hivemind_swarm::AgentRegistry;

pub struct HiveServices {
    gateway: Arc<ExecutionGateway>,
    event_bus: Arc<EventBus>,
    agents: Arc<AgentRegistry>,
}

impl HiveServices {
    pub async fn from_config(config: &NodeConfigManifest) -> Result<Self> {
        let backend = config.spec.storage.backend();

        let pool = match &backend {
            StorageBackend::PostgreSQL(pg) => {
                let db = Database::connect(pg).await?;
                PostgresCommandRecordRepository::new(db.get_pool().clone())
                    .ensure_schema()
                    .await
                    .context("Failed to prepare command_records table")?;
                Some(db.get_pool().clone())
            }
            StorageBackend::InMemory => None,
        };

        let repository = create_command_record_repository(&backend, pool);
        let coordination = Arc::new(CoordinationTable::new(ResultStore::new(repository)));
        let event_bus = Arc::new(EventBus::new(config.spec.events.channel_capacity));
        let gateway = Arc::new(ExecutionGateway::new(
            ToolRegistry::new(),
            coordination,
            event_bus.clone(),
            config.spec.coordination.execution_timeout(),
        ));

        info!(
            node = %config.metadata.name,
            backend = ?config.spec.storage.backend,
            timeout_seconds = config.spec.coordination.execution_timeout_seconds,
            "Hive services initialized"
        );

        Ok(Self {
            gateway,
            event_bus,
            agents: Arc::new(AgentRegistry::new()),
        })
    }

    pub fn gateway(&self) -> &Arc<ExecutionGateway> {
        &self.gateway
    }

    pub fn tools(&self) -> &ToolRegistry {
        self.gateway.tools()
    }

    pub fn result_store(&self) -> &ResultStore {
        self.gateway.result_store()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }
}
