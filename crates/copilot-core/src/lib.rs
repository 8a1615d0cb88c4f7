//! Copilot Core
//!
//! Runtime-agnostic tool-calling LLM orchestration over MCP.
//! This crate provides the engine a flow-development copilot runs on: it
//! connects to an external tool-provider process over the Model Context
//! Protocol, discovers the tools it offers, and drives bounded
//! tool-calling conversations against a chat LLM (OpenAI, DeepSeek,
//! custom OpenAI-compatible endpoints, Azure, Google, Anthropic).
//!
//! The host runtime (a flow engine, a CLI, a service) supplies lifecycle
//! hooks, configuration, credentials and a history store; everything else
//! lives here.
//!
//! ## One turn, end to end
//!
//! ```rust,ignore
//! use copilot_core::config::CopilotConfig;
//! use copilot_core::history::{MemoryConversationStore, SessionKey};
//! use copilot_core::logging::ConsoleLogger;
//! use copilot_core::mcp::McpService;
//! use copilot_core::orchestrator::{Orchestrator, TurnInput};
//! use copilot_core::secrets::EnvSecretStore;
//! use std::sync::Arc;
//!
//! let logger = Arc::new(ConsoleLogger::new());
//!
//! let mcp = Arc::new(McpService::new(logger.clone()));
//! mcp.connect("npx @modelcontextprotocol/server-filesystem /tmp", &[], &Default::default()).await;
//!
//! let orchestrator = Orchestrator::new(
//!     CopilotConfig::new("openai", "gpt-4.1"),
//!     mcp.clone(),
//!     Box::new(MemoryConversationStore::new()),
//!     &EnvSecretStore::new(),
//!     logger,
//! )?;
//!
//! let output = orchestrator
//!     .run_turn(TurnInput::new(SessionKey::Service, "What files are in /tmp?"))
//!     .await;
//! println!("{}", output.content);
//!
//! mcp.cleanup().await;
//! ```

pub mod config;
pub mod history;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod secrets;
pub mod types;

// Re-export commonly used types
pub use types::{
    Message, MessageRole, PromptInfo, ResourceInfo, ServerCapabilities, StreamEvent, TokenUsage,
    Tool, ToolCallRecord, ToolRequest,
};

pub use config::{CopilotConfig, McpServerConfig, SessionMode};

pub use history::{ConversationStore, MemoryConversationStore, SessionKey};

pub use logging::{ConsoleLogger, Logger, NoOpLogger};

pub use mcp::{McpError, McpResult, McpService};

pub use providers::{
    create_adapter, CallOptions, ChatOutcome, ProviderAdapter, ProviderError, ToolExecutor,
};

pub use orchestrator::{Orchestrator, TurnInput, TurnOutput};

pub use prompt::DEFAULT_SYSTEM_PROMPT;
