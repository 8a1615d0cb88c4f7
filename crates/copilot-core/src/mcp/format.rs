//! Tool result formatting
//!
//! Tool results come back in a handful of shapes (content lists, plain
//! strings, bare objects, nothing at all). The conversation loop needs a
//! single string to feed back to the model, with full fidelity and no
//! truncation, and it must get one no matter how malformed the result is.

use serde_json::Value;

/// Fallback text when a result carries nothing usable
const NO_RESULT: &str = "\"No result\"";

/// Normalize a tool result payload into a single string
///
/// - a `content` list is joined with newlines: string items verbatim,
///   `{type: "text", text}` items by their text, anything else as JSON;
/// - a plain-string `content` is returned as-is;
/// - an object `content` is pretty-printed as JSON;
/// - without a `content` field the whole payload is JSON-stringified,
///   falling back to `"No result"` for null.
///
/// Never fails: unserializable corners degrade to descriptive text.
pub fn format_tool_result(result: &Value) -> String {
    match result.get("content") {
        Some(Value::Array(items)) => items
            .iter()
            .map(format_content_item)
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::String(text)) => text.clone(),
        Some(content @ Value::Object(_)) => serde_json::to_string_pretty(content)
            .unwrap_or_else(|e| format!("Error formatting result: {}", e)),
        Some(other) => other.to_string(),
        None => {
            if result.is_null() {
                NO_RESULT.to_string()
            } else {
                serde_json::to_string(result)
                    .unwrap_or_else(|e| format!("Error formatting result: {}", e))
            }
        }
    }
}

fn format_content_item(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("text") {
                if let Some(text) = map.get("text").and_then(Value::as_str) {
                    return text.to_string();
                }
            }
            serde_json::to_string(item).unwrap_or_else(|e| format!("Error formatting result: {}", e))
        }
        other => other.to_string(),
    }
}

/// Format a typed rmcp call result
pub fn format_call_result(result: &rmcp::model::CallToolResult) -> String {
    match serde_json::to_value(result) {
        Ok(value) => format_tool_result(&value),
        Err(e) => format!("Error formatting result: {}", e),
    }
}
