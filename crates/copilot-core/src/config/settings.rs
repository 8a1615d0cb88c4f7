//! Per-instance settings

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which conversation a node instance participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Shared singleton conversation for the sidebar chat
    #[default]
    Service,
    /// Independent conversation per node instance
    Flow,
}

/// Launch specification for the external tool-provider process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct McpServerConfig {
    /// Command to run (may contain embedded arguments, or be a server path)
    pub command: String,
    /// Additional command-line arguments
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables merged over the inherited environment
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl McpServerConfig {
    /// Create a launch spec from a command string
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }
}

/// Configuration for one copilot instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CopilotConfig {
    /// Conversation mode
    pub mode: SessionMode,
    /// LLM provider name (openai, deepseek, custom, azure, google, anthropic)
    pub provider: String,
    /// Model identifier as used by the provider's API
    pub model: String,
    /// Base URL for custom / Azure endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_url: Option<String>,
    /// API key (optional, can come from a secret store)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens per vendor request
    pub max_tokens: u32,
    /// Maximum tool-calling rounds per turn
    pub tool_call_limit: u32,
    /// Character budget for persisted conversation history
    pub max_history_chars: usize,
    /// System prompt override (the built-in default is used when empty)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Tool-provider launch spec (no tools are available when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpServerConfig>,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Service,
            provider: "openai".to_string(),
            model: "gpt-4.1".to_string(),
            custom_url: None,
            api_key: None,
            temperature: 0.1,
            max_tokens: 2000,
            tool_call_limit: 10,
            max_history_chars: 100_000,
            system_prompt: None,
            mcp: None,
        }
    }
}

impl CopilotConfig {
    /// Create a config for a provider/model pair, other fields defaulted
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the custom base URL
    pub fn with_custom_url(mut self, url: impl Into<String>) -> Self {
        self.custom_url = Some(url.into());
        self
    }

    /// Set the tool-provider launch spec
    pub fn with_mcp(mut self, mcp: McpServerConfig) -> Self {
        self.mcp = Some(mcp);
        self
    }
}

/// Split a flat argument string on whitespace
///
/// Host UIs hand arguments over as one text field; empty segments are
/// dropped.
pub fn parse_args_string(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}

/// Parse a flat `KEY=VALUE,KEY2=VALUE2` environment string
///
/// Pairs missing a key or a value are dropped.
pub fn parse_env_string(env: &str) -> HashMap<String, String> {
    env.split(',')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some((key.to_string(), value.to_string()))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CopilotConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.temperature, 0.1);
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.tool_call_limit, 10);
        assert_eq!(config.max_history_chars, 100_000);
        assert_eq!(config.mode, SessionMode::Service);
    }

    #[test]
    fn test_parse_args_string() {
        assert_eq!(parse_args_string("-y server.py"), vec!["-y", "server.py"]);
        assert_eq!(parse_args_string("  a   b "), vec!["a", "b"]);
        assert!(parse_args_string("").is_empty());
    }

    #[test]
    fn test_parse_env_string() {
        let env = parse_env_string("API_TOKEN=abc, DEBUG=1");
        assert_eq!(env.get("API_TOKEN").map(String::as_str), Some("abc"));
        assert_eq!(env.get("DEBUG").map(String::as_str), Some("1"));

        // Malformed pairs are dropped rather than failing the parse
        let partial = parse_env_string("GOOD=x,BAD,=y,EMPTY=");
        assert_eq!(partial.len(), 1);
        assert!(partial.contains_key("GOOD"));
    }

    #[test]
    fn test_partial_deserialization() {
        let config: CopilotConfig =
            serde_yaml::from_str("provider: google\nmodel: gemini-2.5-flash\n").unwrap();
        assert_eq!(config.provider, "google");
        assert_eq!(config.model, "gemini-2.5-flash");
        // Unspecified fields fall back to defaults
        assert_eq!(config.tool_call_limit, 10);
    }
}
