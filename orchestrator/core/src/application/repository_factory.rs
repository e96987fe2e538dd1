// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete command record repository from the storage backend
//! configuration, keeping the domain layer free of infrastructure types.

use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::repository::{CommandRecordRepository, StorageBackend};
use crate::infrastructure::repositories::postgres_command::PostgresCommandRecordRepository;
use crate::infrastructure::repositories::InMemoryCommandRecordRepository;

/// Creates a CommandRecordRepository implementation based on the configured backend
///
/// A PostgreSQL backend without a pool falls back to memory with a warning.
pub fn create_command_record_repository(
    backend: &StorageBackend,
    pool: Option<PgPool>,
) -> Arc<dyn CommandRecordRepository> {
    match (backend, pool) {
        (StorageBackend::PostgreSQL(_), Some(pool)) => {
            Arc::new(PostgresCommandRecordRepository::new(pool))
        }
        (StorageBackend::PostgreSQL(_), None) => {
            tracing::warn!(
                "PostgreSQL backend configured without a connection pool, \
                 using in-memory result store"
            );
            Arc::new(InMemoryCommandRecordRepository::new())
        }
        (StorageBackend::InMemory, _) => Arc::new(InMemoryCommandRecordRepository::new()),
    }
}
