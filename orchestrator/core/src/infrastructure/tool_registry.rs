// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

// Tool Registry
//
// Name-indexed lookup of the Tool implementations this host can run.
// Scanners, shell execution and browser automation register here at
// startup; the gateway resolves tool names against it.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

use crate::domain::tool::Tool;

/// Metadata for listing registered tools
#[derive(Debug, Clone, PartialEq)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<DashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name, replacing any previous tool with that name
    pub fn register(&self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_string();
        info!(tool = %name, "Registering tool");
        self.tools.insert(name, tool)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name).map(|(_, tool)| tool)
    }

    /// Registered tools sorted by name
    pub fn list(&self) -> Vec<ToolMetadata> {
        let mut tools: Vec<ToolMetadata> = self
            .tools
            .iter()
            .map(|entry| ToolMetadata {
                name: entry.key().clone(),
                description: entry.value().description().to_string(),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
