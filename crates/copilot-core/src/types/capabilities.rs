//! Capability metadata for a connected tool-provider process

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::tool::Tool;

/// A resource exposed by the tool provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    /// Resource URI
    pub uri: String,
    /// Display name
    pub name: String,
    /// Description, if the server provided one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&rmcp::model::Resource> for ResourceInfo {
    fn from(resource: &rmcp::model::Resource) -> Self {
        Self {
            uri: resource.raw.uri.clone(),
            name: resource.raw.name.clone(),
            description: resource.raw.description.clone(),
        }
    }
}

/// A prompt template exposed by the tool provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInfo {
    /// Prompt name
    pub name: String,
    /// Description, if the server provided one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&rmcp::model::Prompt> for PromptInfo {
    fn from(prompt: &rmcp::model::Prompt) -> Self {
        Self {
            name: prompt.name.clone(),
            description: prompt.description.clone(),
        }
    }
}

/// Snapshot of everything a connected server exposes
///
/// Owned by the transport client and replaced wholesale on every refresh;
/// consumers hold `Arc` snapshots and never observe partial updates.
#[derive(Debug, Clone)]
pub struct ServerCapabilities {
    /// Callable tools
    pub tools: Vec<Tool>,
    /// Readable resources
    pub resources: Vec<ResourceInfo>,
    /// Prompt templates
    pub prompts: Vec<PromptInfo>,
    /// When this snapshot was taken
    pub connected_at: SystemTime,
}

impl ServerCapabilities {
    /// An empty capability set stamped now
    pub fn empty() -> Self {
        Self {
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
            connected_at: SystemTime::now(),
        }
    }

    /// Names of all known tools, in discovery order
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    /// Look up a tool by name
    pub fn find_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_capabilities() {
        let caps = ServerCapabilities::empty();
        assert!(caps.tools.is_empty());
        assert!(caps.resources.is_empty());
        assert!(caps.prompts.is_empty());
    }

    #[test]
    fn test_tool_lookup() {
        let caps = ServerCapabilities {
            tools: vec![Tool::new("a", "first"), Tool::new("b", "second")],
            resources: Vec::new(),
            prompts: Vec::new(),
            connected_at: SystemTime::now(),
        };

        assert_eq!(caps.tool_names(), vec!["a", "b"]);
        assert!(caps.find_tool("a").is_some());
        assert!(caps.find_tool("c").is_none());
    }
}
