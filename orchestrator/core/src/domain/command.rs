// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Command Records and Tool Results
//!
//! - [`CommandRecord`] - persisted output of a completed command, keyed by fingerprint.
//! - [`ToolResult`] - the normalized outcome returned for every execution attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::fingerprint::{CommandIdentity, Fingerprint};

/// Durable record of a completed command.
///
/// At most one record exists per fingerprint; writes are upserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub fingerprint: Fingerprint,
    pub tool_name: String,
    pub normalized_args: Value,
    pub output: String,
    pub created_at: DateTime<Utc>,
    /// Stored but never enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CommandRecord {
    pub fn new(identity: &CommandIdentity, output: impl Into<String>) -> Self {
        Self {
            fingerprint: identity.fingerprint().clone(),
            tool_name: identity.tool_name().to_string(),
            normalized_args: Value::Object(identity.normalized_args().clone()),
            output: output.into(),
            created_at: Utc::now(),
            expires_at: None,
        }
    }
}

/// Outcome of a gateway request. Every code path produces one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: Map::new(),
            error: None,
        }
    }

    /// A failure whose output is empty.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            data: Map::new(),
            error: Some(error.into()),
        }
    }

    /// A result served without executing the tool.
    pub fn cached(output: impl Into<String>) -> Self {
        Self::ok(output).with_data("cached", Value::Bool(true))
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    pub fn is_cached(&self) -> bool {
        matches!(self.data.get("cached"), Some(Value::Bool(true)))
    }
}
