// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for completed command records, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Record | Implementations |
//! |-------|--------|----------------|
//! | `CommandRecordRepository` | `CommandRecord` | `InMemoryCommandRecordRepository`, `PostgresCommandRecordRepository` |
//!
//! The concrete implementation is selected at startup from the storage
//! section of the configuration manifest.

use async_trait::async_trait;

use crate::domain::command::CommandRecord;
use crate::domain::fingerprint::Fingerprint;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Durable key/value store for completed commands, keyed by fingerprint.
#[async_trait]
pub trait CommandRecordRepository: Send + Sync {
    /// Insert or replace the record for its fingerprint (last write wins)
    async fn save(&self, record: &CommandRecord) -> Result<(), RepositoryError>;

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CommandRecord>, RepositoryError>;

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<(), RepositoryError>;

    /// Most recently created records first
    async fn list_recent(&self, limit: usize) -> Result<Vec<CommandRecord>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
