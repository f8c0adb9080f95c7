//! Functions every registry can start with.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use super::{FunctionDefinition, FunctionRegistry};
use crate::{GenkitError, Result};

/// Register `get_current_time` and `parse_json`.
pub fn register_defaults(registry: &mut FunctionRegistry) -> Result<()> {
    for definition in definitions() {
        registry.register(definition)?;
    }
    Ok(())
}

/// Every built-in function.
pub fn definitions() -> Vec<FunctionDefinition> {
    vec![current_time(), parse_json()]
}

/// `get_current_time`: no arguments, returns an RFC 3339 UTC timestamp.
pub fn current_time() -> FunctionDefinition {
    FunctionDefinition::new(
        "get_current_time",
        "Get the current time in ISO format",
        json!({"type": "object", "properties": {}, "additionalProperties": false}),
        current_time_handler,
    )
}

async fn current_time_handler(_args: Value) -> Result<Value> {
    Ok(Value::String(
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

/// `parse_json`: parses `input` and returns the resulting JSON value.
pub fn parse_json() -> FunctionDefinition {
    FunctionDefinition::new(
        "parse_json",
        "Parse and validate JSON string",
        json!({
            "type": "object",
            "properties": {
                "input": {"type": "string"},
                "schema": {"type": "object"}
            },
            "required": ["input"]
        }),
        parse_json_handler,
    )
}

async fn parse_json_handler(args: Value) -> Result<Value> {
    let input = args["input"].as_str().unwrap_or_default();
    let parsed: Value = serde_json::from_str(input)
        .map_err(|e| GenkitError::Function(format!("invalid JSON input: {e}")))?;
    if let Some(schema) = args.get("schema") {
        super::schema::validate(&parsed, schema)?;
    }
    Ok(parsed)
}
