//! Tool transport error taxonomy

use thiserror::Error;

/// Errors surfaced by the tool transport client
#[derive(Error, Debug)]
pub enum McpError {
    /// Invalid or missing launch target; fatal to the connect attempt only
    #[error("Invalid server configuration: {0}")]
    Config(String),

    /// Tool operation attempted with no active session
    #[error("MCP client not connected")]
    NotConnected,

    /// The server does not know the requested tool
    #[error("Tool \"{name}\" does not exist. Available tools: {}", known_tools_list(.known))]
    UnknownTool { name: String, known: Vec<String> },

    /// The server reported a timeout for this call
    #[error("Tool \"{name}\" call timeout, please check server status")]
    Timeout { name: String },

    /// Any other failure reported by the server for a tool call
    #[error("Tool \"{name}\" call failed: {message}")]
    CallFailed { name: String, message: String },

    /// The server process could not be spawned
    #[error("Failed to spawn MCP server: {0}")]
    Spawn(String),

    /// The MCP session could not be initialized
    #[error("Initialization failed: {0}")]
    Init(String),

    /// Protocol-level failure (discovery, resources, prompts)
    #[error("Protocol error: {0}")]
    Protocol(String),
}

fn known_tools_list(known: &[String]) -> String {
    if known.is_empty() {
        "none".to_string()
    } else {
        known.join(", ")
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_message_lists_catalog() {
        let err = McpError::UnknownTool {
            name: "c".to_string(),
            known: vec!["a".to_string(), "b".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("\"c\""));
        assert!(message.contains("a, b"));
    }

    #[test]
    fn test_unknown_tool_message_with_empty_catalog() {
        let err = McpError::UnknownTool {
            name: "x".to_string(),
            known: Vec::new(),
        };
        assert!(err.to_string().contains("none"));
    }
}
