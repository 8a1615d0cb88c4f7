//! Tool/function calling types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition as discovered from an MCP server
///
/// Immutable once obtained from discovery; the whole set is replaced on
/// every capability refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (unique within a session)
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the input parameters
    #[serde(rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl Tool {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: None,
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

impl From<&rmcp::model::Tool> for Tool {
    fn from(tool: &rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool
                .description
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            // input_schema is Arc<JsonObject>, convert to Value
            input_schema: serde_json::to_value(tool.input_schema.as_ref()).ok(),
        }
    }
}

/// A tool invocation requested by the LLM, before execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Vendor-assigned identifier for this call (empty for vendors without one)
    #[serde(default)]
    pub id: String,
    /// Name of the tool being called
    pub name: String,
    /// Input arguments for the tool
    pub args: Value,
}

impl ToolRequest {
    /// Create a new tool request
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// An immutable log entry for a resolved tool invocation
///
/// Created once the invocation resolves; failures are recorded with the
/// error rendered into `result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Name of the tool that was called
    pub name: String,
    /// Arguments the tool was called with
    pub args: Value,
    /// Formatted result text (or `Error: ...` on failure)
    pub result: String,
}

impl ToolCallRecord {
    /// Create a new record
    pub fn new(name: impl Into<String>, args: Value, result: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args,
            result: result.into(),
        }
    }
}
