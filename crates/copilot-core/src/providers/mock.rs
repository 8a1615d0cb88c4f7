//! Mock adapter for testing
//!
//! Produces deterministic outcomes without network dependencies. Useful
//! for orchestrator tests and for hosts wiring up their plumbing before
//! configuring a real provider.

use async_trait::async_trait;

use crate::types::{EventSink, Message, MessageRole, StreamEvent, Tool, ToolCallRecord};

use super::traits::{failure_notice, CallOptions, ChatOutcome, ProviderAdapter, ToolExecutor};

/// Mock response mode
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Echo back the last user message
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Return a fixed response carrying a tool-call history
    WithRecords {
        content: String,
        records: Vec<ToolCallRecord>,
    },
    /// Report a vendor failure through the normal failure channel
    Failing(String),
}

impl Default for MockMode {
    fn default() -> Self {
        MockMode::Echo
    }
}

/// Mock LLM adapter
pub struct MockAdapter {
    mode: MockMode,
    /// Size of streamed content chunks
    chunk_size: usize,
}

impl MockAdapter {
    /// Create an echo adapter
    pub fn echo() -> Self {
        Self {
            mode: MockMode::Echo,
            chunk_size: 10,
        }
    }

    /// Create a fixed-response adapter
    pub fn fixed(response: impl Into<String>) -> Self {
        Self {
            mode: MockMode::Fixed(response.into()),
            chunk_size: 10,
        }
    }

    /// Create an adapter that reports tool history alongside its response
    pub fn with_records(content: impl Into<String>, records: Vec<ToolCallRecord>) -> Self {
        Self {
            mode: MockMode::WithRecords {
                content: content.into(),
                records,
            },
            chunk_size: 10,
        }
    }

    /// Create an adapter that always reports a vendor failure
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            mode: MockMode::Failing(message.into()),
            chunk_size: 10,
        }
    }

    /// Set the streamed chunk size
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    fn outcome(&self, messages: &[Message]) -> ChatOutcome {
        match &self.mode {
            MockMode::Echo => {
                let last_user = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == MessageRole::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_else(|| "Hello from MockAdapter!".to_string());
                ChatOutcome {
                    content: format!("Echo: {}", last_user),
                    ..Default::default()
                }
            }
            MockMode::Fixed(response) => ChatOutcome {
                content: response.clone(),
                ..Default::default()
            },
            MockMode::WithRecords { content, records } => ChatOutcome {
                content: content.clone(),
                tool_history: records.clone(),
                ..Default::default()
            },
            MockMode::Failing(message) => ChatOutcome {
                content: failure_notice("mock", message),
                error: true,
                ..Default::default()
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(
        &self,
        messages: &[Message],
        _tools: &[Tool],
        _executor: &dyn ToolExecutor,
        _options: &CallOptions,
    ) -> ChatOutcome {
        self.outcome(messages)
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        _tools: &[Tool],
        _executor: &dyn ToolExecutor,
        _options: &CallOptions,
        sink: EventSink,
    ) -> ChatOutcome {
        let outcome = self.outcome(messages);

        let chars: Vec<char> = outcome.content.chars().collect();
        for chunk in chars.chunks(self.chunk_size) {
            let piece: String = chunk.iter().collect();
            let _ = sink.send(StreamEvent::Content(piece)).await;
        }
        let _ = sink.send(StreamEvent::End).await;

        outcome
    }
}
