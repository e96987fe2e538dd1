// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Fingerprint inspection
//!
//! Shows the identity the engine would assign to a tool invocation, which is
//! the key used by the result store and the coordination table.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::{Map, Value};

use hivemind_core::domain::fingerprint::CommandIdentity;

#[derive(Args)]
pub struct FingerprintCommand {
    /// Tool name
    #[arg(value_name = "TOOL")]
    pub tool: String,

    /// Arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
}

pub fn execute(command: FingerprintCommand) -> Result<()> {
    let args = parse_args(&command.args)?;
    let identity = CommandIdentity::new(&command.tool, &args);

    println!("{} {}", "Fingerprint:".bold(), identity.fingerprint());
    println!("{} {}", "Tool:".bold(), identity.tool_name());
    println!("{}", "Normalized arguments:".bold());
    println!(
        "{}",
        serde_json::to_string_pretty(identity.normalized_args())
            .context("Failed to render arguments")?
    );

    Ok(())
}

pub fn parse_args(raw: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("--args is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--args must be a JSON object, got: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args_requires_object() {
        assert!(parse_args(r#"{"target": "10.0.0.1"}"#).is_ok());
        assert!(parse_args("[1, 2]").is_err());
        assert!(parse_args("not json").is_err());
    }

    #[test]
    fn test_context_keys_do_not_change_identity() {
        let plain = parse_args(r#"{"target": "10.0.0.1", "ports": [22]}"#).unwrap();
        let attributed =
            parse_args(r#"{"scanId": "s1", "ports": [22], "target": "10.0.0.1"}"#).unwrap();

        assert_eq!(
            CommandIdentity::new("portscan", &plain).fingerprint(),
            CommandIdentity::new("portscan", &attributed).fingerprint()
        );
    }
}
