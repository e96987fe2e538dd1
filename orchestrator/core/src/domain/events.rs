// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Command Lifecycle Events
//!
//! The gateway reports every step of a request through an [`EventSink`].
//! The real transport (WebSocket broadcast to the UI) lives outside the
//! core; in-process observers subscribe to
//! [`EventBus`](crate::infrastructure::event_bus::EventBus).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::agent::{AgentId, CallerContext, ProjectId};
use crate::domain::fingerprint::Fingerprint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandEventKind {
    Started,
    Waiting,
    Executing,
    Completed,
    Failed,
    Cached,
}

impl CommandEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Waiting => "waiting",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cached => "cached",
        }
    }

    /// Whether this event ends a request's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cached)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEvent {
    pub id: Uuid,
    pub kind: CommandEventKind,
    pub fingerprint: Fingerprint,
    pub agent_id: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub tool_name: String,
    #[serde(default)]
    pub payload: Value,
    pub emitted_at: DateTime<Utc>,
}

impl CommandEvent {
    pub fn new(
        kind: CommandEventKind,
        fingerprint: &Fingerprint,
        tool_name: &str,
        context: &CallerContext,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            fingerprint: fingerprint.clone(),
            agent_id: context.agent_id.clone(),
            project_id: context.project_id.clone(),
            tool_name: tool_name.to_string(),
            payload,
            emitted_at: Utc::now(),
        }
    }
}

/// Narrow outbound interface for lifecycle events. Implementations may fail;
/// the gateway logs and swallows the error.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: CommandEvent) -> Result<(), EventSinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EventSinkError {
    #[error("Event transport unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode event: {0}")]
    Encoding(String),
}
