// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Coordination Table
//!
//! In-memory map from fingerprint to the single in-flight execution of that
//! command. The first caller to [`acquire`](CoordinationTable::acquire) a
//! fingerprint becomes the leader and runs the tool; everyone else becomes a
//! follower and waits on the leader's completion handle.
//!
//! Per fingerprint the table moves `ABSENT -> RUNNING -> ABSENT`. The
//! completion handle is a `watch` channel resolved exactly once, under the
//! table lock, immediately before the entry is removed. Receivers obtained
//! while the entry existed therefore always observe the final output.
//!
//! The table lock is synchronous and never held across an `.await`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::application::result_store::ResultStore;
use crate::domain::agent::AgentId;
use crate::domain::fingerprint::{CommandIdentity, Fingerprint};
use crate::domain::repository::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinationError {
    #[error("No running or cached command for fingerprint {0}")]
    NotRunning(Fingerprint),

    #[error("Leader for fingerprint {0} went away without a result")]
    LeaderVanished(Fingerprint),

    #[error("Result store lookup failed: {0}")]
    Store(#[from] RepositoryError),
}

struct RunningCommand {
    identity: CommandIdentity,
    leader: AgentId,
    subscribers: HashSet<AgentId>,
    completion: watch::Sender<Option<String>>,
    started_at: DateTime<Utc>,
}

/// Snapshot of one in-flight command (for operators and telemetry)
#[derive(Debug, Clone)]
pub struct RunningCommandInfo {
    pub fingerprint: Fingerprint,
    pub tool_name: String,
    pub leader: AgentId,
    pub subscriber_count: usize,
    pub started_at: DateTime<Utc>,
}

pub struct CoordinationTable {
    running: Mutex<HashMap<Fingerprint, RunningCommand>>,
    store: ResultStore,
}

impl CoordinationTable {
    pub fn new(store: ResultStore) -> Self {
        Self {
            running: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// Become leader (`true`) or join the running execution as a follower (`false`).
    pub fn acquire(&self, identity: &CommandIdentity, agent_id: &AgentId) -> bool {
        let fingerprint = identity.fingerprint();
        let mut running = self.running.lock();

        if let Some(entry) = running.get_mut(fingerprint) {
            entry.subscribers.insert(agent_id.clone());
            debug!(
                fingerprint = %fingerprint.short(),
                agent_id = %agent_id,
                leader = %entry.leader,
                subscribers = entry.subscribers.len(),
                "Joined running command as follower"
            );
            return false;
        }

        let (completion, _) = watch::channel(None);
        running.insert(
            fingerprint.clone(),
            RunningCommand {
                identity: identity.clone(),
                leader: agent_id.clone(),
                subscribers: HashSet::from([agent_id.clone()]),
                completion,
                started_at: Utc::now(),
            },
        );
        debug!(
            fingerprint = %fingerprint.short(),
            agent_id = %agent_id,
            tool = identity.tool_name(),
            "Acquired command as leader"
        );
        true
    }

    pub fn is_running(&self, fingerprint: &Fingerprint) -> bool {
        self.running.lock().contains_key(fingerprint)
    }

    /// Wait for the leader's output.
    ///
    /// When nothing is running the result store is consulted instead, since
    /// the leader may have released between `acquire` and this call.
    pub async fn wait_for_result(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<String, CoordinationError> {
        let receiver = self
            .running
            .lock()
            .get(fingerprint)
            .map(|entry| entry.completion.subscribe());

        match receiver {
            Some(mut rx) => {
                let value = rx
                    .wait_for(|output| output.is_some())
                    .await
                    .map_err(|_| CoordinationError::LeaderVanished(fingerprint.clone()))?;
                value
                    .clone()
                    .ok_or_else(|| CoordinationError::LeaderVanished(fingerprint.clone()))
            }
            None => self
                .store
                .get(fingerprint)
                .await?
                .ok_or_else(|| CoordinationError::NotRunning(fingerprint.clone())),
        }
    }

    /// Persist the leader's output, wake every waiter and drop the entry.
    ///
    /// Returns how many agents were subscribed, the leader included. The
    /// record is written before the entry disappears so that a request
    /// arriving afterwards is served from the store.
    pub async fn release(&self, fingerprint: &Fingerprint, output: String) -> usize {
        let identity = self
            .running
            .lock()
            .get(fingerprint)
            .map(|entry| entry.identity.clone());

        let Some(identity) = identity else {
            warn!(
                fingerprint = %fingerprint.short(),
                "Release called for a command that is not running"
            );
            return 0;
        };

        if let Err(e) = self.store.put(&identity, output.as_str()).await {
            warn!(
                fingerprint = %fingerprint.short(),
                error = %e,
                "Failed to persist command output, followers are still released"
            );
        }

        let subscribers = self.resolve(fingerprint, output);
        info!(
            fingerprint = %fingerprint.short(),
            tool = identity.tool_name(),
            subscribers,
            "Command released"
        );
        subscribers
    }

    /// Wake waiters with `output` and drop the entry without persisting anything.
    ///
    /// Used when the leader can no longer call [`release`](Self::release),
    /// e.g. because its task was cancelled.
    pub fn abandon(&self, fingerprint: &Fingerprint, output: String) -> usize {
        let subscribers = self.resolve(fingerprint, output);
        if subscribers > 0 {
            warn!(
                fingerprint = %fingerprint.short(),
                subscribers,
                "Command abandoned by its leader"
            );
        }
        subscribers
    }

    fn resolve(&self, fingerprint: &Fingerprint, output: String) -> usize {
        let mut running = self.running.lock();
        match running.remove(fingerprint) {
            Some(entry) => {
                entry.completion.send_replace(Some(output));
                entry.subscribers.len()
            }
            None => 0,
        }
    }

    pub fn subscribers(&self, fingerprint: &Fingerprint) -> Option<HashSet<AgentId>> {
        self.running
            .lock()
            .get(fingerprint)
            .map(|entry| entry.subscribers.clone())
    }

    pub fn running_count(&self) -> usize {
        self.running.lock().len()
    }

    pub fn snapshot(&self) -> Vec<RunningCommandInfo> {
        self.running
            .lock()
            .iter()
            .map(|(fingerprint, entry)| RunningCommandInfo {
                fingerprint: fingerprint.clone(),
                tool_name: entry.identity.tool_name().to_string(),
                leader: entry.leader.clone(),
                subscriber_count: entry.subscribers.len(),
                started_at: entry.started_at,
            })
            .collect()
    }

    pub fn result_store(&self) -> &ResultStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryCommandRecordRepository;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn table() -> Arc<CoordinationTable> {
        let store = ResultStore::new(Arc::new(InMemoryCommandRecordRepository::new()));
        Arc::new(CoordinationTable::new(store))
    }

    fn identity() -> CommandIdentity {
        let args = json!({"target": "10.0.0.1"});
        CommandIdentity::new("portscan", args.as_object().unwrap())
    }

    #[test]
    fn test_first_caller_leads_others_follow() {
        let table = table();
        let id = identity();

        assert!(table.acquire(&id, &AgentId::new("a")));
        assert!(!table.acquire(&id, &AgentId::new("b")));
        assert!(!table.acquire(&id, &AgentId::new("c")));

        assert!(table.is_running(id.fingerprint()));
        assert_eq!(table.running_count(), 1);
        assert_eq!(table.subscribers(id.fingerprint()).unwrap().len(), 3);

        let snapshot = table.snapshot();
        assert_eq!(snapshot[0].leader, AgentId::new("a"));
        assert_eq!(snapshot[0].tool_name, "portscan");
    }

    #[tokio::test]
    async fn test_release_wakes_followers_and_persists() {
        let table = table();
        let id = identity();
        let fp = id.fingerprint().clone();

        assert!(table.acquire(&id, &AgentId::new("a")));
        assert!(!table.acquire(&id, &AgentId::new("b")));

        let waiter = {
            let table = Arc::clone(&table);
            let fp = fp.clone();
            tokio::spawn(async move { table.wait_for_result(&fp).await })
        };
        tokio::task::yield_now().await;

        assert_eq!(table.release(&fp, "22/tcp open".to_string()).await, 2);
        assert_eq!(waiter.await.unwrap().unwrap(), "22/tcp open");

        assert!(!table.is_running(&fp));
        assert!(table.subscribers(&fp).is_none());
        assert_eq!(
            table.result_store().get(&fp).await.unwrap().as_deref(),
            Some("22/tcp open")
        );
    }

    #[tokio::test]
    async fn test_wait_after_release_reads_store() {
        let table = table();
        let id = identity();
        let fp = id.fingerprint().clone();

        table.acquire(&id, &AgentId::new("a"));
        table.release(&fp, "done".to_string()).await;

        assert_eq!(table.wait_for_result(&fp).await.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_wait_on_unknown_fingerprint_fails() {
        let table = table();
        let err = table.wait_for_result(identity().fingerprint()).await.unwrap_err();
        assert!(matches!(err, CoordinationError::NotRunning(_)));
    }

    #[tokio::test]
    async fn test_release_twice_is_harmless() {
        let table = table();
        let id = identity();
        table.acquire(&id, &AgentId::new("a"));

        assert_eq!(table.release(id.fingerprint(), "one".to_string()).await, 1);
        assert_eq!(table.release(id.fingerprint(), "two".to_string()).await, 0);
        assert_eq!(
            table.result_store().get(id.fingerprint()).await.unwrap().as_deref(),
            Some("one")
        );
    }

    #[tokio::test]
    async fn test_abandon_wakes_followers_without_persisting() {
        let table = table();
        let id = identity();
        let fp = id.fingerprint().clone();

        table.acquire(&id, &AgentId::new("a"));
        table.acquire(&id, &AgentId::new("b"));

        let waiter = {
            let table = Arc::clone(&table);
            let fp = fp.clone();
            tokio::spawn(async move { table.wait_for_result(&fp).await })
        };
        tokio::task::yield_now().await;

        assert_eq!(table.abandon(&fp, "Error: cancelled".to_string()), 2);
        assert_eq!(waiter.await.unwrap().unwrap(), "Error: cancelled");
        assert!(!table.is_running(&fp));
        assert!(table.result_store().get(&fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancelled_follower_does_not_affect_others() {
        let table = table();
        let id = identity();
        let fp = id.fingerprint().clone();
        table.acquire(&id, &AgentId::new("a"));

        let spawn_waiter = || {
            let table = Arc::clone(&table);
            let fp = fp.clone();
            tokio::spawn(async move { table.wait_for_result(&fp).await })
        };
        let cancelled = spawn_waiter();
        let survivor = spawn_waiter();
        tokio::task::yield_now().await;

        cancelled.abort();
        tokio::time::sleep(Duration::from_millis(5)).await;

        table.release(&fp, "out".to_string()).await;
        assert_eq!(survivor.await.unwrap().unwrap(), "out");
        assert!(cancelled.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_concurrent_acquire_elects_one_leader() {
        let table = table();
        let id = identity();

        let mut handles = Vec::new();
        for i in 0..32 {
            let table = Arc::clone(&table);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                table.acquire(&id, &AgentId::new(format!("agent-{i}")))
            }));
        }

        let mut leaders = 0;
        for handle in handles {
            if handle.await.unwrap() {
                leaders += 1;
            }
        }
        assert_eq!(leaders, 1);
        assert_eq!(table.subscribers(id.fingerprint()).unwrap().len(), 32);
    }
}
