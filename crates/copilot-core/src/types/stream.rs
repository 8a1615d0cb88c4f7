//! Streaming event types

use serde::{Deserialize, Serialize};

/// An event emitted while a streaming chat turn is in progress
///
/// Events arrive on a bounded channel in the order they occur: zero or more
/// `Content`/`Tool`/`Error` events, an optional `Warning`, then exactly one
/// `End`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental text content
    Content(String),
    /// A tool invocation is starting
    Tool(String),
    /// Non-fatal condition (e.g. tool-call limit reached)
    Warning(String),
    /// A tool invocation or vendor call failed; the turn continues
    Error(String),
    /// End of stream, always the last event
    End,
}

impl StreamEvent {
    /// Check if this is a content chunk
    pub fn is_content(&self) -> bool {
        matches!(self, StreamEvent::Content(_))
    }

    /// Get the text if this is a content chunk
    pub fn as_content(&self) -> Option<&str> {
        match self {
            StreamEvent::Content(text) => Some(text),
            _ => None,
        }
    }
}

/// Sending half of a stream-event channel
pub type EventSink = tokio::sync::mpsc::Sender<StreamEvent>;
