//! Chat message types

use serde::{Deserialize, Serialize};

use super::tool::ToolCallRecord;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    /// Tool-result message fed back into the conversation after a tool call
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// A chat message
///
/// `tool_history` is an out-of-band annotation on assistant messages. It is
/// never sent verbatim to a provider; `history::embed` renders it into the
/// visible content at request-build time so later turns can reuse prior tool
/// results without re-invoking the tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: MessageRole,
    /// The text content of the message
    pub content: String,
    /// Identifier linking a tool-result message to the tool call it answers
    #[serde(rename = "toolCallId", skip_serializing_if = "Option::is_none", default)]
    pub tool_call_id: Option<String>,
    /// Record of the tool calls that produced this (assistant) message
    #[serde(
        rename = "toolHistory",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    pub tool_history: Vec<ToolCallRecord>,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
            tool_history: Vec::new(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
            tool_history: Vec::new(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_history: Vec::new(),
        }
    }

    /// Create a tool-result message answering the given tool call id
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_history: Vec::new(),
        }
    }

    /// Attach a tool-call history annotation
    pub fn with_tool_history(mut self, records: Vec<ToolCallRecord>) -> Self {
        self.tool_history = records;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_creation() {
        let sys = Message::system("You are helpful");
        assert_eq!(sys.role, MessageRole::System);
        assert_eq!(sys.content, "You are helpful");

        let user = Message::user("Hello");
        assert_eq!(user.role, MessageRole::User);

        let tool = Message::tool_result("call_1", "ok");
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("Hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"content\":\"Hello\""));
        // Empty annotations stay off the wire
        assert!(!json.contains("toolHistory"));
        assert!(!json.contains("toolCallId"));
    }

    #[test]
    fn test_tool_history_round_trip() {
        let msg = Message::assistant("done").with_tool_history(vec![ToolCallRecord::new(
            "get-flows",
            json!({"tab": "1"}),
            "[]",
        )]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("toolHistory"));

        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
