// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Types
//!
//! - [`AgentRegistration`] - an active agent and the project it works on.
//! - [`Discovery`] - one attributed, timestamped entry in a project's feed.

use chrono::{DateTime, Utc};
use hivemind_core::domain::agent::{AgentId, ProjectId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An agent announced to its peers.
///
/// Keyed uniquely by `agent_id`; registering the same id again replaces the
/// previous entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub agent_id: AgentId,
    pub project_id: ProjectId,
    /// Free-form role, e.g. "recon" or "exploit".
    pub role: String,
    pub registered_at: DateTime<Utc>,
}

impl AgentRegistration {
    pub fn new(agent_id: AgentId, project_id: ProjectId, role: impl Into<String>) -> Self {
        Self {
            agent_id,
            project_id,
            role: role.into(),
            registered_at: Utc::now(),
        }
    }
}

/// A finding shared with every agent on the same project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discovery {
    /// Position in the project's feed, starting at 1.
    pub sequence: u64,
    pub payload: Value,
    pub discovered_by: AgentId,
    pub discovered_at: DateTime<Utc>,
}

impl Discovery {
    pub fn is_after(&self, since: DateTime<Utc>) -> bool {
        self.discovered_at > since
    }
}
