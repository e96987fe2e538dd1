// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # Argument Validation
//!
//! Tool arguments are checked against the tool's JSON Schema before the
//! gateway touches the result store or the coordination table. All
//! violations are reported together so the calling agent can fix them in
//! one round trip.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument schema for tool '{tool}': {message}")]
    InvalidSchema { tool: String, message: String },

    #[error("Invalid arguments for tool '{tool}': {}", violations.join("; "))]
    InvalidArguments { tool: String, violations: Vec<String> },
}

/// Validate `args` against `schema`, collecting every violation.
pub fn validate_arguments(
    tool: &str,
    schema: &Value,
    args: &Map<String, Value>,
) -> Result<(), ValidationError> {
    let validator = jsonschema::options()
        .build(schema)
        .map_err(|e| ValidationError::InvalidSchema {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;

    let instance = Value::Object(args.clone());
    let violations: Vec<String> = validator
        .iter_errors(&instance)
        .map(|error| {
            let path = error.instance_path().to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{path}: {error}")
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidArguments {
            tool: tool.to_string(),
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn portscan_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "target": { "type": "string" },
                "ports": { "type": "array", "items": { "type": "integer" } }
            },
            "required": ["target"]
        })
    }

    #[test]
    fn test_valid_arguments_pass() {
        let args = json!({"target": "10.0.0.1", "ports": [22, 443]});
        let args = args.as_object().unwrap();
        assert!(validate_arguments("portscan", &portscan_schema(), args).is_ok());
    }

    #[test]
    fn test_missing_required_argument() {
        let args = Map::new();
        let err = validate_arguments("portscan", &portscan_schema(), &args).unwrap_err();
        match err {
            ValidationError::InvalidArguments { tool, violations } => {
                assert_eq!(tool, "portscan");
                assert_eq!(violations.len(), 1);
                assert!(violations[0].contains("target"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_all_violations_are_reported() {
        let args = json!({"ports": ["http"]});
        let args = args.as_object().unwrap();
        let err = validate_arguments("portscan", &portscan_schema(), args).unwrap_err();
        match err {
            ValidationError::InvalidArguments { violations, .. } => assert_eq!(violations.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let schema = json!({"type": 12});
        let err = validate_arguments("portscan", &schema, &Map::new()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSchema { .. }));
    }

    #[test]
    fn test_permissive_schema_accepts_anything() {
        let args = json!({"anything": {"nested": true}});
        assert!(validate_arguments("echo", &json!({}), args.as_object().unwrap()).is_ok());
    }
}
