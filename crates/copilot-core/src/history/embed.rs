//! Tool-history re-embedding
//!
//! Assistant messages carry their tool calls as an out-of-band annotation.
//! Before a request is built, the annotation is rendered back into the
//! visible content so the model can reuse earlier results instead of
//! calling the same tools again.

use crate::types::{Message, MessageRole, ToolCallRecord};

/// Marker prefixed to every re-embedded tool call line
///
/// The default system prompt teaches the model to look for this marker, so
/// the two must stay in sync.
pub const TOOL_HISTORY_MARKER: &str = "[tool-history]";

fn render_records(records: &[ToolCallRecord]) -> String {
    records
        .iter()
        .map(|record| {
            format!(
                "{} {}({}) -> {}",
                TOOL_HISTORY_MARKER, record.name, record.args, record.result
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render tool-history annotations into message content
///
/// Pure transform over a copy: the input and its elements are never
/// mutated, and applying it twice to the same input yields equal output
/// (already-embedded messages keep their annotation, so the block is
/// appended from the annotation each time, never re-derived from content).
pub fn embed(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .map(|msg| {
            if msg.tool_history.is_empty() {
                msg.clone()
            } else {
                let mut embedded = msg.clone();
                embedded.content =
                    format!("{}\n\n{}", msg.content, render_records(&msg.tool_history));
                embedded
            }
        })
        .collect()
}

/// Role-tagged transcript for providers with a symmetric role vocabulary
///
/// Returns `(role, content)` pairs with tool history embedded.
pub fn flatten(messages: &[Message]) -> Vec<(MessageRole, String)> {
    embed(messages)
        .into_iter()
        .map(|msg| (msg.role, msg.content))
        .collect()
}

/// Role-remapped transcript for providers with an asymmetric vocabulary
///
/// `assistant` becomes `model`; every other role becomes `user`. System
/// messages must be filtered out by the caller beforehand (they travel as a
/// separate instruction field for these providers).
pub fn flatten_remapped(messages: &[Message]) -> Vec<(&'static str, String)> {
    embed(messages)
        .into_iter()
        .map(|msg| {
            let role = match msg.role {
                MessageRole::Assistant => "model",
                _ => "user",
            };
            (role, msg.content)
        })
        .collect()
}
