// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the command record storage contract
//! defined in the domain layer.
//!
//! # Available Implementations
//!
//! - **PostgresCommandRecordRepository** - durable `command_records` table
//! - **InMemoryCommandRecordRepository** - lock-guarded map for tests and
//!   ephemeral deployments
//!
//! # Usage
//!
//! ```no_run
//! # async fn run(database_url: &str) -> anyhow::Result<()> {
//! use hivemind_core::infrastructure::repositories::postgres_command::PostgresCommandRecordRepository;
//!
//! let pool = sqlx::PgPool::connect(database_url).await?;
//! let repo = PostgresCommandRecordRepository::new(pool);
//! repo.ensure_schema().await?;
//! # Ok(())
//! # }
//! ```

pub mod postgres_command;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::command::CommandRecord;
use crate::domain::fingerprint::Fingerprint;
use crate::domain::repository::{CommandRecordRepository, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryCommandRecordRepository {
    records: Arc<RwLock<HashMap<Fingerprint, CommandRecord>>>,
}

impl InMemoryCommandRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CommandRecordRepository for InMemoryCommandRecordRepository {
    async fn save(&self, record: &CommandRecord) -> Result<(), RepositoryError> {
        self.records
            .write()
            .insert(record.fingerprint.clone(), record.clone());
        Ok(())
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CommandRecord>, RepositoryError> {
        Ok(self.records.read().get(fingerprint).cloned())
    }

    async fn delete(&self, fingerprint: &Fingerprint) -> Result<(), RepositoryError> {
        self.records.write().remove(fingerprint);
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<CommandRecord>, RepositoryError> {
        let mut records: Vec<CommandRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fingerprint::CommandIdentity;
    use serde_json::json;

    fn identity(target: &str) -> CommandIdentity {
        let args = json!({ "target": target });
        CommandIdentity::new("portscan", args.as_object().unwrap())
    }

    #[tokio::test]
    async fn test_save_is_upsert() {
        let repo = InMemoryCommandRecordRepository::new();
        let id = identity("10.0.0.1");

        repo.save(&CommandRecord::new(&id, "first")).await.unwrap();
        repo.save(&CommandRecord::new(&id, "second")).await.unwrap();

        assert_eq!(repo.len(), 1);
        let found = repo.find_by_fingerprint(id.fingerprint()).await.unwrap().unwrap();
        assert_eq!(found.output, "second");
        assert_eq!(found.normalized_args, json!({ "target": "10.0.0.1" }));
    }

    #[tokio::test]
    async fn test_delete_and_missing() {
        let repo = InMemoryCommandRecordRepository::new();
        let id = identity("10.0.0.2");

        assert!(repo.find_by_fingerprint(id.fingerprint()).await.unwrap().is_none());
        repo.save(&CommandRecord::new(&id, "out")).await.unwrap();
        repo.delete(id.fingerprint()).await.unwrap();
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_list_recent_newest_first() {
        let repo = InMemoryCommandRecordRepository::new();
        for (i, target) in ["a", "b", "c"].iter().enumerate() {
            let mut record = CommandRecord::new(&identity(target), *target);
            record.created_at += chrono::Duration::seconds(i as i64);
            repo.save(&record).await.unwrap();
        }

        let recent = repo.list_recent(2).await.unwrap();
        let outputs: Vec<&str> = recent.iter().map(|r| r.output.as_str()).collect();
        assert_eq!(outputs, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_concurrent_writers_same_fingerprint() {
        let repo = InMemoryCommandRecordRepository::new();
        let id = identity("10.0.0.3");

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                repo.save(&CommandRecord::new(&id, format!("out-{i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(repo.len(), 1);
        let found = repo.find_by_fingerprint(id.fingerprint()).await.unwrap().unwrap();
        assert!(found.output.starts_with("out-"));
    }
}
