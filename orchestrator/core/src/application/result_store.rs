// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Result Store
//!
//! Durable cache of completed command outputs keyed by fingerprint. Sits on
//! top of whichever [`CommandRecordRepository`] the storage configuration
//! selected; concurrent writers for one fingerprint resolve last-write-wins
//! inside the repository.
//!
//! `expires_at` is persisted as `None` and never consulted on read.

use std::sync::Arc;
use tracing::debug;

use crate::domain::command::CommandRecord;
use crate::domain::fingerprint::{CommandIdentity, Fingerprint};
use crate::domain::repository::{CommandRecordRepository, RepositoryError};

#[derive(Clone)]
pub struct ResultStore {
    repository: Arc<dyn CommandRecordRepository>,
}

impl ResultStore {
    pub fn new(repository: Arc<dyn CommandRecordRepository>) -> Self {
        Self { repository }
    }

    /// Cached output for a fingerprint, if any
    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>, RepositoryError> {
        let record = self.repository.find_by_fingerprint(fingerprint).await?;
        debug!(fingerprint = %fingerprint.short(), hit = record.is_some(), "Result store lookup");
        Ok(record.map(|r| r.output))
    }

    /// Persist the output of a completed command, replacing any earlier record
    pub async fn put(
        &self,
        identity: &CommandIdentity,
        output: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        let record = CommandRecord::new(identity, output);
        self.repository.save(&record).await?;
        debug!(
            fingerprint = %identity.fingerprint().short(),
            tool = identity.tool_name(),
            "Result stored"
        );
        Ok(())
    }

    pub async fn record(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CommandRecord>, RepositoryError> {
        self.repository.find_by_fingerprint(fingerprint).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<CommandRecord>, RepositoryError> {
        self.repository.list_recent(limit).await
    }

    pub async fn evict(&self, fingerprint: &Fingerprint) -> Result<(), RepositoryError> {
        self.repository.delete(fingerprint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryCommandRecordRepository;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = ResultStore::new(Arc::new(InMemoryCommandRecordRepository::new()));
        let args = json!({"target": "10.0.0.1"});
        let identity = CommandIdentity::new("portscan", args.as_object().unwrap());

        assert_eq!(store.get(identity.fingerprint()).await.unwrap(), None);

        store.put(&identity, "22/tcp open").await.unwrap();
        assert_eq!(
            store.get(identity.fingerprint()).await.unwrap().as_deref(),
            Some("22/tcp open")
        );

        let record = store.record(identity.fingerprint()).await.unwrap().unwrap();
        assert_eq!(record.tool_name, "portscan");
        assert!(record.expires_at.is_none());

        store.evict(identity.fingerprint()).await.unwrap();
        assert_eq!(store.get(identity.fingerprint()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_context_keys_share_cache_entry() {
        let store = ResultStore::new(Arc::new(InMemoryCommandRecordRepository::new()));
        let from_a = json!({"target": "10.0.0.1", "agentId": "a"});
        let from_b = json!({"agentId": "b", "target": "10.0.0.1"});

        store
            .put(&CommandIdentity::new("portscan", from_a.as_object().unwrap()), "out")
            .await
            .unwrap();

        let identity_b = CommandIdentity::new("portscan", from_b.as_object().unwrap());
        assert_eq!(store.get(identity_b.fingerprint()).await.unwrap().as_deref(), Some("out"));
    }
}
