//! Tool parameter extraction.
//!
//! Agents are loose with types: numbers arrive as strings and lists arrive
//! as comma-separated strings. These helpers accept both and report
//! anything else as [`AdapterError::InvalidParams`].

use serde_json::Value;

use crate::error::{AdapterError, Result};

fn invalid(tool: &str, reason: impl Into<String>) -> AdapterError {
    AdapterError::InvalidParams {
        tool_name: tool.to_string(),
        reason: reason.into(),
    }
}

/// A required, non-empty string.
pub fn required_str<'a>(params: &'a Value, tool: &str, key: &str) -> Result<&'a str> {
    optional_str(params, tool, key)?
        .ok_or_else(|| invalid(tool, format!("missing required parameter `{key}`")))
}

/// An optional string; empty strings count as absent.
pub fn optional_str<'a>(params: &'a Value, tool: &str, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(invalid(tool, format!("`{key}` must be a string"))),
    }
}

/// A positive integer with a default.
pub fn positive_int(params: &Value, tool: &str, key: &str, default: u32) -> Result<u32> {
    let value = match params.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    value
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| invalid(tool, format!("`{key}` must be a positive integer")))
}

pub fn bool_or(params: &Value, tool: &str, key: &str, default: bool) -> Result<bool> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            _ => Err(invalid(tool, format!("`{key}` must be a boolean"))),
        },
        Some(_) => Err(invalid(tool, format!("`{key}` must be a boolean"))),
    }
}

/// A list of strings given as a JSON array or a comma-separated string.
pub fn string_list(params: &Value, tool: &str, key: &str) -> Result<Vec<String>> {
    let items: Vec<String> = match params.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(s)) => s.split(',').map(|p| p.trim().to_string()).collect(),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| invalid(tool, format!("`{key}` must contain only strings")))
            })
            .collect::<Result<_>>()?,
        Some(_) => return Err(invalid(tool, format!("`{key}` must be a list of strings"))),
    };

    Ok(items.into_iter().filter(|s| !s.is_empty()).collect())
}
