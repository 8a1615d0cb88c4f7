//! Provider adapter contract

use async_trait::async_trait;
use serde_json::Value;

use crate::config::CopilotConfig;
use crate::mcp::McpResult;
use crate::types::{EventSink, Message, TokenUsage, Tool, ToolCallRecord};

/// Knobs for one adapter call
///
/// Defaults are applied only when the host omits a value; everything passes
/// through to the vendor unchanged.
#[derive(Debug, Clone, Copy)]
pub struct CallOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum output tokens per vendor request
    pub max_tokens: u32,
    /// Hard cap on tool-calling rounds within one call
    pub max_rounds: u32,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 2000,
            max_rounds: 10,
        }
    }
}

impl CallOptions {
    /// Build options from an instance config
    pub fn from_config(config: &CopilotConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_rounds: config.tool_call_limit,
        }
    }

    /// Set the round cap
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }
}

/// Result of one adapter call
///
/// A failed vendor call still produces an outcome: `error` is set and
/// `content` carries the user-visible diagnostic. The adapter never throws
/// past its own boundary.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    /// Assistant text (plus tool notes in non-streaming mode)
    pub content: String,
    /// Usage reported by the last vendor exchange
    pub usage: Option<TokenUsage>,
    /// Tool calls executed during the call, in order
    pub tool_history: Vec<ToolCallRecord>,
    /// True when this outcome reports a vendor failure
    pub error: bool,
}

impl ChatOutcome {
    /// Build the failure-reporting outcome for a vendor error
    pub fn failure(provider: &str, error: &crate::providers::ProviderError) -> Self {
        Self {
            content: failure_notice(provider, &error.to_string()),
            usage: None,
            tool_history: Vec::new(),
            error: true,
        }
    }
}

/// User-visible failure notice with the troubleshooting checklist
pub fn failure_notice(provider: &str, error: &str) -> String {
    format!(
        "LLM API call failed ({provider}): {error}\n\nPlease check:\n\
         1. API key is correct\n\
         2. Network connection is working\n\
         3. Model name is valid\n\
         4. API quota is sufficient"
    )
}

/// Executes tool invocations requested by the model
///
/// Implemented by the MCP transport client; tests substitute fakes. The
/// returned string is the formatted result ready for conversation embedding.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute one tool call and format its result
    async fn execute_tool(&self, name: &str, args: &Value) -> McpResult<String>;
}

/// One vendor-specific adapter
///
/// Selected once at configuration time; both methods drive the same bounded
/// tool-calling loop and differ only in whether incremental events are
/// emitted.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name for logging and error reporting
    fn name(&self) -> &str;

    /// Run one conversation turn without streaming
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
        options: &CallOptions,
    ) -> ChatOutcome;

    /// Run one conversation turn, emitting incremental events to `sink`
    ///
    /// The sink is a bounded channel: slow consumers backpressure the
    /// stream. `StreamEvent::End` is always the last event, on success and
    /// failure alike.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
        options: &CallOptions,
        sink: EventSink,
    ) -> ChatOutcome;
}
