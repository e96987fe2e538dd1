// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Agent Registry Application Service
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Shared registry of active agents and per-project discovery feeds
//!
//! Every mutation goes through one structure-wide lock held for a single
//! operation only. Reads return owned snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hivemind_core::domain::agent::{AgentId, ProjectId};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::domain::{AgentRegistration, Discovery};

/// What a project reset removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectReset {
    pub discoveries_removed: usize,
    pub agents_unregistered: usize,
}

#[async_trait]
pub trait SwarmService: Send + Sync {
    async fn register_agent(
        &self,
        agent_id: AgentId,
        project_id: ProjectId,
        role: String,
    ) -> AgentRegistration;
    async fn unregister_agent(&self, agent_id: &AgentId) -> Option<AgentRegistration>;
    async fn share_discovery(
        &self,
        agent_id: &AgentId,
        project_id: &ProjectId,
        payload: Value,
    ) -> Discovery;
    async fn get_discoveries(
        &self,
        project_id: &ProjectId,
        since: Option<DateTime<Utc>>,
    ) -> Vec<Discovery>;
    async fn get_active_agents(
        &self,
        project_id: Option<&ProjectId>,
    ) -> HashMap<AgentId, AgentRegistration>;
    async fn clear_project_state(&self, project_id: &ProjectId) -> ProjectReset;
}

#[derive(Default)]
struct ProjectFeed {
    entries: Vec<Discovery>,
    next_sequence: u64,
}

#[derive(Default)]
struct SwarmState {
    agents: HashMap<AgentId, AgentRegistration>,
    feeds: HashMap<ProjectId, ProjectFeed>,
}

#[derive(Default)]
pub struct AgentRegistry {
    state: Mutex<SwarmState>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent_count(&self) -> usize {
        self.state.lock().agents.len()
    }
}

#[async_trait]
impl SwarmService for AgentRegistry {
    async fn register_agent(
        &self,
        agent_id: AgentId,
        project_id: ProjectId,
        role: String,
    ) -> AgentRegistration {
        let registration = AgentRegistration::new(agent_id.clone(), project_id, role);
        let previous = self
            .state
            .lock()
            .agents
            .insert(agent_id.clone(), registration.clone());

        info!(
            agent_id = %agent_id,
            project_id = %registration.project_id,
            role = %registration.role,
            replaced = previous.is_some(),
            "Agent registered"
        );
        registration
    }

    async fn unregister_agent(&self, agent_id: &AgentId) -> Option<AgentRegistration> {
        let removed = self.state.lock().agents.remove(agent_id);
        if removed.is_some() {
            info!(agent_id = %agent_id, "Agent unregistered");
        }
        removed
    }

    async fn share_discovery(
        &self,
        agent_id: &AgentId,
        project_id: &ProjectId,
        payload: Value,
    ) -> Discovery {
        let discovery = {
            let mut state = self.state.lock();
            let feed = state.feeds.entry(project_id.clone()).or_default();
            feed.next_sequence += 1;
            let discovery = Discovery {
                sequence: feed.next_sequence,
                payload,
                discovered_by: agent_id.clone(),
                discovered_at: Utc::now(),
            };
            feed.entries.push(discovery.clone());
            discovery
        };

        debug!(
            agent_id = %agent_id,
            project_id = %project_id,
            sequence = discovery.sequence,
            "Discovery shared"
        );
        discovery
    }

    async fn get_discoveries(
        &self,
        project_id: &ProjectId,
        since: Option<DateTime<Utc>>,
    ) -> Vec<Discovery> {
        let state = self.state.lock();
        let Some(feed) = state.feeds.get(project_id) else {
            return Vec::new();
        };

        match since {
            Some(since) => feed
                .entries
                .iter()
                .filter(|d| d.is_after(since))
                .cloned()
                .collect(),
            None => feed.entries.clone(),
        }
    }

    async fn get_active_agents(
        &self,
        project_id: Option<&ProjectId>,
    ) -> HashMap<AgentId, AgentRegistration> {
        self.state
            .lock()
            .agents
            .iter()
            .filter(|(_, r)| project_id.map_or(true, |p| &r.project_id == p))
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect()
    }

    async fn clear_project_state(&self, project_id: &ProjectId) -> ProjectReset {
        let reset = {
            let mut state = self.state.lock();
            let discoveries_removed = state
                .feeds
                .remove(project_id)
                .map_or(0, |feed| feed.entries.len());
            let before = state.agents.len();
            state.agents.retain(|_, r| &r.project_id != project_id);
            ProjectReset {
                discoveries_removed,
                agents_unregistered: before - state.agents.len(),
            }
        };

        info!(
            project_id = %project_id,
            discoveries_removed = reset.discoveries_removed,
            agents_unregistered = reset.agents_unregistered,
            "Project state cleared"
        );
        reset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn project(id: &str) -> ProjectId {
        ProjectId::new(id)
    }

    #[tokio::test]
    async fn test_register_filter_and_unregister() {
        let registry = AgentRegistry::new();
        registry.register_agent(AgentId::new("a"), project("p1"), "recon".into()).await;
        registry.register_agent(AgentId::new("b"), project("p1"), "exploit".into()).await;
        registry.register_agent(AgentId::new("c"), project("p2"), "recon".into()).await;

        assert_eq!(registry.get_active_agents(None).await.len(), 3);
        let p1 = registry.get_active_agents(Some(&project("p1"))).await;
        assert_eq!(p1.len(), 2);
        assert_eq!(p1[&AgentId::new("b")].role, "exploit");

        let removed = registry.unregister_agent(&AgentId::new("a")).await.unwrap();
        assert_eq!(removed.project_id, project("p1"));
        assert!(registry.unregister_agent(&AgentId::new("a")).await.is_none());
        assert_eq!(registry.agent_count(), 2);
    }

    #[tokio::test]
    async fn test_reregistration_replaces_entry() {
        let registry = AgentRegistry::new();
        registry.register_agent(AgentId::new("a"), project("p1"), "recon".into()).await;
        registry.register_agent(AgentId::new("a"), project("p2"), "report".into()).await;

        let agents = registry.get_active_agents(None).await;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[&AgentId::new("a")].project_id, project("p2"));
    }

    #[tokio::test]
    async fn test_share_discovery_enriches_entry() {
        let registry = AgentRegistry::new();
        let discovery = registry
            .share_discovery(&AgentId::new("a"), &project("p1"), json!({"port": 443}))
            .await;

        assert_eq!(discovery.sequence, 1);
        assert_eq!(discovery.discovered_by, AgentId::new("a"));
        assert_eq!(discovery.payload, json!({"port": 443}));
    }

    #[tokio::test]
    async fn test_feed_is_append_only_superset() {
        let registry = AgentRegistry::new();
        let p = project("p1");
        registry.share_discovery(&AgentId::new("a"), &p, json!("first")).await;
        registry.share_discovery(&AgentId::new("b"), &p, json!("second")).await;

        let before = registry.get_discoveries(&p, None).await;
        registry.share_discovery(&AgentId::new("a"), &p, json!("third")).await;
        let after = registry.get_discoveries(&p, None).await;

        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(&after[..before.len()], &before[..]);
        let sequences: Vec<u64> = after.iter().map(|d| d.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_since_filters_strictly_after() {
        let registry = AgentRegistry::new();
        let p = project("p1");
        let first = registry.share_discovery(&AgentId::new("a"), &p, json!(1)).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        registry.share_discovery(&AgentId::new("a"), &p, json!(2)).await;

        let newer = registry.get_discoveries(&p, Some(first.discovered_at)).await;
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].payload, json!(2));
    }

    #[tokio::test]
    async fn test_projects_are_isolated() {
        let registry = AgentRegistry::new();
        registry.share_discovery(&AgentId::new("a"), &project("p1"), json!("x")).await;
        let other = registry.share_discovery(&AgentId::new("b"), &project("p2"), json!("y")).await;

        assert_eq!(other.sequence, 1);
        assert_eq!(registry.get_discoveries(&project("p1"), None).await.len(), 1);
        assert!(registry.get_discoveries(&project("p3"), None).await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_project_state() {
        let registry = AgentRegistry::new();
        let p1 = project("p1");
        registry.register_agent(AgentId::new("a"), p1.clone(), "recon".into()).await;
        registry.register_agent(AgentId::new("b"), project("p2"), "recon".into()).await;
        registry.share_discovery(&AgentId::new("a"), &p1, json!("x")).await;
        registry.share_discovery(&AgentId::new("a"), &p1, json!("y")).await;

        let reset = registry.clear_project_state(&p1).await;
        assert_eq!(
            reset,
            ProjectReset {
                discoveries_removed: 2,
                agents_unregistered: 1
            }
        );
        assert!(registry.get_discoveries(&p1, None).await.is_empty());
        assert_eq!(registry.get_active_agents(None).await.len(), 1);

        let restarted = registry.share_discovery(&AgentId::new("a"), &p1, json!("z")).await;
        assert_eq!(restarted.sequence, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sharing_keeps_sequence_dense() {
        let registry = Arc::new(AgentRegistry::new());
        let p = project("p1");

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let p = p.clone();
                tokio::spawn(async move {
                    registry
                        .share_discovery(&AgentId::new(format!("agent-{i}")), &p, json!(i))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let feed = registry.get_discoveries(&p, None).await;
        let sequences: Vec<u64> = feed.iter().map(|d| d.sequence).collect();
        assert_eq!(sequences, (1..=50).collect::<Vec<u64>>());
    }
}
