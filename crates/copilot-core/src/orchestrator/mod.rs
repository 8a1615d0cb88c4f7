//! Per-turn orchestration
//!
//! Ties the transport client, the provider adapter and the history manager
//! together: build the message list, fetch available tools, run the
//! adapter's tool-calling loop, then append, truncate and persist the
//! conversation.

use std::sync::Arc;

use crate::config::CopilotConfig;
use crate::history::{self, ConversationStore, SessionKey};
use crate::log_warn;
use crate::logging::SharedLogger;
use crate::mcp::McpService;
use crate::prompt::DEFAULT_SYSTEM_PROMPT;
use crate::providers::{
    create_adapter, CallOptions, ProviderAdapter, ProviderResult,
};
use crate::secrets::SecretStore;
use crate::types::{EventSink, Message, TokenUsage, Tool, ToolCallRecord};

/// Input for one conversation turn
#[derive(Debug, Clone)]
pub struct TurnInput {
    /// Which persisted conversation this turn belongs to
    pub session: SessionKey,
    /// The user's message
    pub text: String,
    /// Extra history handed in by the host, appended to the stored history
    pub prior_history: Option<Vec<Message>>,
}

impl TurnInput {
    /// Create a turn input with no host-provided history
    pub fn new(session: SessionKey, text: impl Into<String>) -> Self {
        Self {
            session,
            text: text.into(),
            prior_history: None,
        }
    }
}

/// Result of one conversation turn
///
/// A turn always completes with a chat message; provider failures arrive
/// here as `error == true` with the diagnostic in `content`.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    /// Assistant response text
    pub content: String,
    /// The updated (already truncated and persisted) history
    pub history: Vec<Message>,
    /// Tool calls executed during this turn, in order
    pub tool_history: Vec<ToolCallRecord>,
    /// Usage reported by the provider, when available
    pub usage: Option<TokenUsage>,
    /// True when the provider call failed
    pub error: bool,
}

/// Drives complete conversation turns for one node instance
pub struct Orchestrator {
    config: CopilotConfig,
    adapter: Box<dyn ProviderAdapter>,
    mcp: Arc<McpService>,
    store: Box<dyn ConversationStore>,
    logger: SharedLogger,
}

impl Orchestrator {
    /// Create an orchestrator, resolving the API key through the secret store
    ///
    /// Fails only on configuration errors: unknown provider name, missing
    /// credential, missing base URL.
    pub fn new(
        config: CopilotConfig,
        mcp: Arc<McpService>,
        store: Box<dyn ConversationStore>,
        secrets: &dyn SecretStore,
        logger: SharedLogger,
    ) -> ProviderResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| secrets.get(&config.provider))
            .unwrap_or_default();

        let adapter = create_adapter(&config, &api_key, Arc::clone(&logger))?;
        Ok(Self::with_adapter(config, adapter, mcp, store, logger))
    }

    /// Create an orchestrator around an already-built adapter
    pub fn with_adapter(
        config: CopilotConfig,
        adapter: Box<dyn ProviderAdapter>,
        mcp: Arc<McpService>,
        store: Box<dyn ConversationStore>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            config,
            adapter,
            mcp,
            store,
            logger,
        }
    }

    /// The instance configuration
    pub fn config(&self) -> &CopilotConfig {
        &self.config
    }

    fn system_prompt(&self) -> &str {
        self.config
            .system_prompt
            .as_deref()
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Tools currently available; never fatal
    async fn available_tools(&self) -> Vec<Tool> {
        if !self.mcp.is_connected().await {
            return Vec::new();
        }
        match self.mcp.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                log_warn!(self.logger, "Failed to get MCP tools list: {}", e);
                Vec::new()
            }
        }
    }

    /// Run one turn without streaming
    pub async fn run_turn(&self, input: TurnInput) -> TurnOutput {
        self.execute(input, None).await
    }

    /// Run one turn, emitting incremental events to `sink`
    pub async fn run_turn_stream(&self, input: TurnInput, sink: EventSink) -> TurnOutput {
        self.execute(input, Some(sink)).await
    }

    async fn execute(&self, input: TurnInput, sink: Option<EventSink>) -> TurnOutput {
        let session = input.session;

        let mut history = self.store.load(&session).await;
        if let Some(extra) = input.prior_history {
            history.extend(extra);
        }
        history.push(Message::user(input.text));

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.system_prompt()));
        messages.extend(history.iter().cloned());

        let tools = self.available_tools().await;
        let options = CallOptions::from_config(&self.config);

        let outcome = match sink {
            None => {
                self.adapter
                    .chat(&messages, &tools, self.mcp.as_ref(), &options)
                    .await
            }
            Some(sink) => {
                self.adapter
                    .chat_stream(&messages, &tools, self.mcp.as_ref(), &options, sink)
                    .await
            }
        };

        if !outcome.content.is_empty() {
            history.push(
                Message::assistant(&outcome.content)
                    .with_tool_history(outcome.tool_history.clone()),
            );
        }

        let history = self.persist(&session, history).await;

        TurnOutput {
            content: outcome.content,
            history,
            tool_history: outcome.tool_history,
            usage: outcome.usage,
            error: outcome.error,
        }
    }

    /// Truncate and save; the single path to the store for writes
    async fn persist(&self, session: &SessionKey, history: Vec<Message>) -> Vec<Message> {
        let before = history.len();
        let truncated = history::truncate(history, self.config.max_history_chars);
        if truncated.len() < before {
            log_warn!(
                self.logger,
                "Truncated conversation history: {} -> {} messages",
                before,
                truncated.len()
            );
        }
        self.store.save(session, truncated.clone()).await;
        truncated
    }
}
