// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Execution Gateway
//!
//! Turns `(tool, args, caller)` into a [`ToolResult`]:
//!
//! 1. validate the arguments against the tool's schema
//! 2. serve from the [`ResultStore`] on a fingerprint hit
//! 3. otherwise [`acquire`](CoordinationTable::acquire) the fingerprint;
//!    followers wait for the leader's output
//! 4. the leader runs the tool under a hard timeout and always releases
//!
//! No error escapes to the caller. Validation, timeout, execution and
//! coordination failures all become `ToolResult { success: false, .. }`.

use futures::FutureExt;
use metrics::counter;
use serde_json::{json, Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::application::coordination::{CoordinationError, CoordinationTable};
use crate::application::result_store::ResultStore;
use crate::domain::agent::CallerContext;
use crate::domain::command::ToolResult;
use crate::domain::events::{CommandEvent, CommandEventKind, EventSink};
use crate::domain::fingerprint::{CommandIdentity, Fingerprint};
use crate::domain::tool::Tool;
use crate::domain::validation::{validate_arguments, ValidationError};
use crate::infrastructure::tool_registry::ToolRegistry;

pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(300);

const CANCELLED_OUTPUT: &str = "Error: command cancelled before completion";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Coordination(#[from] CoordinationError),
}

impl GatewayError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Timeout(_) => "timeout",
            Self::Execution(_) => "execution",
            Self::Coordination(_) => "coordination",
        }
    }

    /// Text handed to followers and persisted for a failed leader attempt
    fn output(&self) -> String {
        match self {
            Self::Validation(_) | Self::Coordination(_) => String::new(),
            other => format!("Error: {other}"),
        }
    }
}

impl From<GatewayError> for ToolResult {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::Timeout(_) => ToolResult::failure("timeout").with_output(err.output()),
            GatewayError::Execution(message) => {
                ToolResult::failure(message.clone()).with_output(err.output())
            }
            GatewayError::Validation(_) | GatewayError::Coordination(_) => {
                ToolResult::failure(err.to_string())
            }
        }
    }
}

pub struct ExecutionGateway {
    tools: ToolRegistry,
    store: ResultStore,
    coordination: Arc<CoordinationTable>,
    events: Arc<dyn EventSink>,
    execution_timeout: Duration,
}

impl ExecutionGateway {
    pub fn new(
        tools: ToolRegistry,
        coordination: Arc<CoordinationTable>,
        events: Arc<dyn EventSink>,
        execution_timeout: Duration,
    ) -> Self {
        Self {
            tools,
            store: coordination.result_store().clone(),
            coordination,
            events,
            execution_timeout,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn coordination(&self) -> &Arc<CoordinationTable> {
        &self.coordination
    }

    pub fn result_store(&self) -> &ResultStore {
        &self.store
    }

    pub fn execution_timeout(&self) -> Duration {
        self.execution_timeout
    }

    /// Run a registered tool by name
    pub async fn execute(
        &self,
        tool_name: &str,
        args: &Map<String, Value>,
        context: &CallerContext,
    ) -> ToolResult {
        match self.tools.get(tool_name) {
            Some(tool) => self.execute_tool(tool, args, context).await,
            None => self.reject(
                tool_name,
                context,
                ValidationError::UnknownTool(tool_name.to_string()),
            ),
        }
    }

    /// Run an explicitly supplied tool
    pub async fn execute_tool(
        &self,
        tool: Arc<dyn Tool>,
        args: &Map<String, Value>,
        context: &CallerContext,
    ) -> ToolResult {
        let identity = CommandIdentity::new(tool.name(), args);

        let schema = tool.argument_schema();
        if let Err(e) = validate_arguments(tool.name(), &schema, identity.normalized_args()) {
            return self.reject(tool.name(), context, e);
        }

        self.emit(
            CommandEventKind::Started,
            &identity,
            context,
            json!({ "args": identity.normalized_args() }),
        )
        .await;

        if let Some(output) = self.cached_output(identity.fingerprint()).await {
            counter!("hivemind_commands_total", "outcome" => "cached").increment(1);
            debug!(
                fingerprint = %identity.fingerprint().short(),
                agent_id = %context.agent_id,
                "Serving command from result store"
            );
            self.emit(CommandEventKind::Cached, &identity, context, json!({})).await;
            return ToolResult::cached(output);
        }

        if self.coordination.acquire(&identity, &context.agent_id) {
            self.lead(tool, &identity, context).await
        } else {
            self.follow(&identity, context).await
        }
    }

    async fn lead(
        &self,
        tool: Arc<dyn Tool>,
        identity: &CommandIdentity,
        context: &CallerContext,
    ) -> ToolResult {
        let fingerprint = identity.fingerprint();
        let mut guard = LeaderGuard::new(Arc::clone(&self.coordination), fingerprint.clone());

        // A previous leader may have released after our first store lookup began.
        if let Some(output) = self.cached_output(fingerprint).await {
            guard.set_output(output.clone());
            let subscribers = self.coordination.release(fingerprint, output.clone()).await;
            guard.disarm();

            counter!("hivemind_commands_total", "outcome" => "cached").increment(1);
            debug!(
                fingerprint = %fingerprint.short(),
                agent_id = %context.agent_id,
                subscribers,
                "Result stored while acquiring, skipping execution"
            );
            self.emit(CommandEventKind::Cached, identity, context, json!({})).await;
            return ToolResult::cached(output);
        }

        counter!("hivemind_commands_total", "outcome" => "leader").increment(1);

        info!(
            fingerprint = %fingerprint.short(),
            agent_id = %context.agent_id,
            tool = identity.tool_name(),
            "Executing command as leader"
        );
        self.emit(CommandEventKind::Executing, identity, context, json!({})).await;

        let outcome = self.run_tool(tool.as_ref(), identity.normalized_args()).await;
        let (result, output) = match outcome {
            Ok(result) => {
                let output = result.output.clone();
                (result.with_data("cached", Value::Bool(false)), output)
            }
            Err(e) => {
                counter!("hivemind_command_failures_total", "kind" => e.kind()).increment(1);
                warn!(
                    fingerprint = %fingerprint.short(),
                    agent_id = %context.agent_id,
                    error = %e,
                    "Leader execution failed"
                );
                let output = e.output();
                (ToolResult::from(e), output)
            }
        };

        guard.set_output(output.clone());
        let subscribers = self.coordination.release(fingerprint, output).await;
        guard.disarm();

        self.emit_terminal(identity, context, &result, json!({ "subscribers": subscribers }))
            .await;
        result
    }

    async fn follow(&self, identity: &CommandIdentity, context: &CallerContext) -> ToolResult {
        let fingerprint = identity.fingerprint();
        counter!("hivemind_commands_total", "outcome" => "follower").increment(1);
        debug!(
            fingerprint = %fingerprint.short(),
            agent_id = %context.agent_id,
            "Waiting for running command"
        );
        self.emit(CommandEventKind::Waiting, identity, context, json!({})).await;

        let result = match self.coordination.wait_for_result(fingerprint).await {
            Ok(output) => Self::hive_result(output),
            Err(e) => {
                warn!(
                    fingerprint = %fingerprint.short(),
                    agent_id = %context.agent_id,
                    error = %e,
                    "Wait failed, re-checking result store"
                );
                match self.cached_output(fingerprint).await {
                    Some(output) => Self::hive_result(output),
                    None => {
                        counter!("hivemind_command_failures_total", "kind" => "coordination")
                            .increment(1);
                        ToolResult::from(GatewayError::Coordination(e))
                    }
                }
            }
        };

        self.emit_terminal(identity, context, &result, json!({ "source": "hive_wait" }))
            .await;
        result
    }

    async fn run_tool(
        &self,
        tool: &dyn Tool,
        args: &Map<String, Value>,
    ) -> Result<ToolResult, GatewayError> {
        let execution = AssertUnwindSafe(tool.execute(args)).catch_unwind();

        match tokio::time::timeout(self.execution_timeout, execution).await {
            Err(_) => Err(GatewayError::Timeout(self.execution_timeout)),
            Ok(Err(panic)) => Err(GatewayError::Execution(panic_message(&*panic))),
            Ok(Ok(Err(e))) => Err(GatewayError::Execution(e.to_string())),
            Ok(Ok(Ok(result))) => Ok(result),
        }
    }

    async fn cached_output(&self, fingerprint: &Fingerprint) -> Option<String> {
        match self.store.get(fingerprint).await {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    fingerprint = %fingerprint.short(),
                    error = %e,
                    "Result store lookup failed, treating as miss"
                );
                None
            }
        }
    }

    fn hive_result(output: String) -> ToolResult {
        ToolResult::cached(output).with_data("source", json!("hive_wait"))
    }

    fn reject(&self, tool_name: &str, context: &CallerContext, err: ValidationError) -> ToolResult {
        counter!("hivemind_commands_total", "outcome" => "rejected").increment(1);
        debug!(tool = tool_name, agent_id = %context.agent_id, error = %err, "Rejected command");
        ToolResult::from(GatewayError::Validation(err))
    }

    async fn emit_terminal(
        &self,
        identity: &CommandIdentity,
        context: &CallerContext,
        result: &ToolResult,
        mut payload: Value,
    ) {
        let kind = if result.success {
            CommandEventKind::Completed
        } else {
            CommandEventKind::Failed
        };
        if let Value::Object(fields) = &mut payload {
            fields.insert("success".to_string(), Value::Bool(result.success));
            if let Some(error) = &result.error {
                fields.insert("error".to_string(), Value::String(error.clone()));
            }
        }
        self.emit(kind, identity, context, payload).await;
    }

    async fn emit(
        &self,
        kind: CommandEventKind,
        identity: &CommandIdentity,
        context: &CallerContext,
        payload: Value,
    ) {
        let event = CommandEvent::new(
            kind,
            identity.fingerprint(),
            identity.tool_name(),
            context,
            payload,
        );

        match AssertUnwindSafe(self.events.emit(event)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                kind = kind.as_str(),
                fingerprint = %identity.fingerprint().short(),
                error = %e,
                "Failed to emit command event"
            ),
            Err(_) => warn!(
                kind = kind.as_str(),
                fingerprint = %identity.fingerprint().short(),
                "Event sink panicked while emitting"
            ),
        }
    }
}

/// Releases followers if the leader's future is dropped before it could call `release`.
struct LeaderGuard {
    coordination: Arc<CoordinationTable>,
    fingerprint: Fingerprint,
    output: Option<String>,
    armed: bool,
}

impl LeaderGuard {
    fn new(coordination: Arc<CoordinationTable>, fingerprint: Fingerprint) -> Self {
        Self {
            coordination,
            fingerprint,
            output: None,
            armed: true,
        }
    }

    fn set_output(&mut self, output: String) {
        self.output = Some(output);
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        if self.armed {
            let output = self
                .output
                .take()
                .unwrap_or_else(|| CANCELLED_OUTPUT.to_string());
            self.coordination.abandon(&self.fingerprint, output);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "tool panicked".to_string()
    }
}
