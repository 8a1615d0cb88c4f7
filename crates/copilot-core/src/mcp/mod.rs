//! MCP (Model Context Protocol) transport module
//!
//! Spawns an external tool-provider process over the official rmcp SDK's
//! child-process transport and presents discovery and invocation as a
//! capability-oriented API.
//!
//! # Example
//!
//! ```rust,ignore
//! use copilot_core::mcp::McpService;
//! use copilot_core::logging::NoOpLogger;
//! use std::sync::Arc;
//!
//! let client = McpService::new(Arc::new(NoOpLogger));
//!
//! if client.connect("npx @modelcontextprotocol/server-filesystem /tmp", &[], &Default::default()).await {
//!     let tools = client.list_tools().await?;
//!     let result = client.call_tool("read_file", serde_json::json!({
//!         "path": "/tmp/notes.txt"
//!     })).await?;
//! }
//! client.cleanup().await;
//! ```

mod client;
mod error;
mod format;
mod launch;

pub use client::McpService;
pub use error::{McpError, McpResult};
pub use format::{format_call_result, format_tool_result};
pub use launch::LaunchSpec;
