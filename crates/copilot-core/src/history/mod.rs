//! Conversation history management
//!
//! Three concerns: re-embedding recorded tool calls into visible content
//! (`embed`), keeping histories within a character budget (`truncate`), and
//! persistence (`ConversationStore`).

mod embed;
mod store;
mod truncate;

pub use embed::{embed, flatten, flatten_remapped, TOOL_HISTORY_MARKER};
pub use store::{ConversationStore, MemoryConversationStore, SessionKey};
pub use truncate::{serialized_len, truncate, DEFAULT_MAX_CHARS};
