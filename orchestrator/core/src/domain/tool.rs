// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Tool Contract
//!
//! Network scanners, shell execution, browser automation and every other
//! capability reach the engine through [`Tool`]. The gateway treats an
//! implementation as a black box: it validates arguments against
//! [`Tool::argument_schema`] before dispatch and bounds [`Tool::execute`]
//! with a timeout.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::domain::command::ToolResult;

/// An externally supplied capability invoked by agents.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for lookup and fingerprinting.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// JSON Schema describing the accepted argument object.
    fn argument_schema(&self) -> Value {
        json!({ "type": "object" })
    }

    /// Run the tool. Arguments have already been validated and stripped of caller context.
    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolResult, ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{0}")]
    Execution(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected tool output: {0}")]
    Output(String),
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}
