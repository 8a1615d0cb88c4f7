//! Core type definitions shared across the crate

mod capabilities;
mod message;
mod stream;
mod tool;
mod usage;

pub use capabilities::{PromptInfo, ResourceInfo, ServerCapabilities};
pub use message::{Message, MessageRole};
pub use stream::{EventSink, StreamEvent};
pub use tool::{Tool, ToolCallRecord, ToolRequest};
pub use usage::TokenUsage;
