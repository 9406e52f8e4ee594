//! Provider tool-call normalization.
//!
//! Providers disagree on how a tool-call request is shaped: the id may be
//! `id`, `tool_call_id` or `call_id`; the name may sit at the top level as
//! `name`/`tool_name` or nested under `function.name`; arguments appear as
//! `arguments`, `args`, `input` or `function.arguments`, sometimes as a JSON
//! string instead of an object. This adapter maps every convention into the
//! internal [`ToolCallRequest`] shape at the provider boundary so nothing
//! downstream ever sees a provider-specific field name.

use serde_json::Value;

use stockmind_context::ToolCallRequest;

/// Normalize raw provider tool-call values.
///
/// Entries without a resolvable tool name are dropped with a warning.
/// Entries without an id get a positional `call_<n>` fallback.
pub fn normalize_tool_calls(raw: &[Value]) -> Vec<ToolCallRequest> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, value)| normalize_one(value, index))
        .collect()
}

fn normalize_one(value: &Value, index: usize) -> Option<ToolCallRequest> {
    let name = extract_name(value)?;

    let id = ["id", "tool_call_id", "call_id"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{index}"));

    let arguments = extract_arguments(value);

    Some(ToolCallRequest {
        id,
        name,
        arguments,
    })
}

fn extract_name(value: &Value) -> Option<String> {
    let name = ["name", "tool_name"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .or_else(|| value.pointer("/function/name").and_then(Value::as_str));

    match name {
        Some(n) if !n.is_empty() => Some(n.to_string()),
        _ => {
            tracing::warn!(raw = %value, "dropping tool call with no resolvable name");
            None
        }
    }
}

fn extract_arguments(value: &Value) -> Value {
    let raw = ["arguments", "args", "input"]
        .iter()
        .find_map(|k| value.get(*k))
        .or_else(|| value.pointer("/function/arguments"));

    match raw {
        None => Value::Object(serde_json::Map::new()),
        // Providers that serialize arguments as a JSON string get parsed;
        // a string that is not JSON is passed through as-is.
        Some(Value::String(s)) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
        }
        Some(other) => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
