// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Command Fingerprints
//!
//! A [`Fingerprint`] is the sole identity of a command for deduplication,
//! caching and coordination. It is derived from the tool name and the
//! argument map with caller-context keys removed and top-level keys sorted,
//! so insertion order never changes the result.
//!
//! Nested values are serialized exactly as `serde_json` renders them and are
//! not canonicalized further.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Argument keys that identify the caller rather than the command.
pub const CONTEXT_KEYS: &[&str] = &[
    "agent_id",
    "agentId",
    "project_id",
    "projectId",
    "scan_id",
    "scanId",
];

/// Deterministic identity of a (tool, arguments) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already computed fingerprint (e.g. read back from storage or typed by an operator).
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A command reduced to what identifies it: tool name, normalized arguments and fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandIdentity {
    tool_name: String,
    normalized_args: Map<String, Value>,
    fingerprint: Fingerprint,
}

impl CommandIdentity {
    pub fn new(tool_name: &str, args: &Map<String, Value>) -> Self {
        let normalized_args = normalize_args(args);
        let fingerprint = compute(tool_name, &normalized_args);
        Self {
            tool_name: tool_name.to_string(),
            normalized_args,
            fingerprint,
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn normalized_args(&self) -> &Map<String, Value> {
        &self.normalized_args
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

/// Fingerprint a tool invocation without keeping the normalized arguments around.
pub fn fingerprint(tool_name: &str, args: &Map<String, Value>) -> Fingerprint {
    compute(tool_name, &normalize_args(args))
}

/// Drop caller-context keys; the remaining top-level keys are kept in sorted order.
pub fn normalize_args(args: &Map<String, Value>) -> Map<String, Value> {
    let sorted: BTreeMap<&String, &Value> = args
        .iter()
        .filter(|(key, _)| !CONTEXT_KEYS.contains(&key.as_str()))
        .collect();

    sorted
        .into_iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn compute(tool_name: &str, normalized_args: &Map<String, Value>) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(tool_name.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_json(normalized_args).as_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

// Writes the top level by hand so key order is fixed regardless of how the
// map type orders its entries.
fn canonical_json(normalized_args: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = normalized_args.keys().collect();
    keys.sort();

    let mut out = String::from("{");
    for (index, key) in keys.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        out.push_str(&normalized_args[key].to_string());
    }
    out.push('}');
    out
}
