//! Conversation history truncation
//!
//! Keeps a session's message list within a character budget while
//! preferring the ends of the conversation: the first message (priming
//! context) and the most recent turns. Losing middle-aged context is
//! acceptable; losing either end is not.

use crate::types::Message;

/// Default serialized-size budget in characters
pub const DEFAULT_MAX_CHARS: usize = 100_000;

/// Share of the budget the greedy prefix pass may fill, in percent
const PREFIX_BUDGET_PERCENT: usize = 80;

/// Number of trailing messages kept unconditionally
const RECENT_WINDOW: usize = 10;

/// Early-stop threshold: stop the prefix pass on overflow only while more
/// than this many older messages remain unconsidered
const EARLY_STOP_REMAINING: usize = 5;

/// Serialized size of a message list, as persisted
pub fn serialized_len(history: &[Message]) -> usize {
    serde_json::to_string(history).map(|s| s.len()).unwrap_or(0)
}

fn message_len(message: &Message) -> usize {
    // +1 for the separating comma in the serialized array
    serde_json::to_string(message).map(|s| s.len() + 1).unwrap_or(0)
}

/// Truncate a history to roughly `max_chars` serialized characters
///
/// Within budget, the input is returned unchanged. Otherwise the result is
/// `[first message] + [greedy prefix of older messages] + [last 10]`:
///
/// - the first message is always kept;
/// - the recency window is the last 10 non-first messages, kept
///   unconditionally regardless of size (so the result can still exceed the
///   budget when those alone do);
/// - the remaining "older" messages are re-added from the front until 80%
///   of the budget is reached, stopping early on overflow only while more
///   than 5 of them remain unconsidered.
///
/// The prefix pass and the recency window operate on disjoint ranges, so a
/// message can never appear twice in the output.
pub fn truncate(history: Vec<Message>, max_chars: usize) -> Vec<Message> {
    if history.is_empty() {
        return history;
    }

    if serialized_len(&history) <= max_chars {
        return history;
    }

    let mut kept = vec![history[0].clone()];
    let rest = &history[1..];

    let recent_start = rest.len().saturating_sub(RECENT_WINDOW);
    let (older, recent) = rest.split_at(recent_start);

    let target = max_chars * PREFIX_BUDGET_PERCENT / 100;
    let mut current = serialized_len(&kept);

    for (index, message) in older.iter().enumerate() {
        let next = current + message_len(message);
        if next > target && older.len() - index > EARLY_STOP_REMAINING {
            break;
        }
        kept.push(message.clone());
        current = next;
        if current >= target {
            break;
        }
    }

    kept.extend(recent.iter().cloned());
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(i: usize, size: usize) -> Message {
        Message::user(format!("{:02}-{}", i, "x".repeat(size)))
    }

    fn history(count: usize, size: usize) -> Vec<Message> {
        (0..count).map(|i| message(i, size)).collect()
    }

    #[test]
    fn test_small_history_unchanged() {
        // 3 messages around 500 chars total, budget far above
        let input = history(3, 150);
        assert!(serialized_len(&input) < 1000);

        let output = truncate(input.clone(), DEFAULT_MAX_CHARS);
        assert_eq!(output, input);
    }

    #[test]
    fn test_empty_history() {
        assert!(truncate(Vec::new(), 100).is_empty());
    }

    #[test]
    fn test_preserves_first_and_recent() {
        let input = history(50, 400);
        let output = truncate(input.clone(), 4_000);

        // First message survives
        assert_eq!(output[0], input[0]);

        // The last 10 survive, in order, at the tail of the output
        let tail = &output[output.len() - 10..];
        assert_eq!(tail, &input[40..]);
    }

    #[test]
    fn test_no_message_appears_twice() {
        let input = history(30, 300);
        let output = truncate(input, 5_000);

        let mut seen = std::collections::HashSet::new();
        for msg in &output {
            assert!(seen.insert(msg.content.clone()), "duplicate: {}", msg.content);
        }
    }

    #[test]
    fn test_relative_order_is_preserved() {
        let input = history(40, 500);
        let output = truncate(input.clone(), 6_000);

        let positions: Vec<usize> = output
            .iter()
            .map(|m| input.iter().position(|orig| orig == m).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_recent_window_kept_even_when_oversized() {
        // Each recent message alone dwarfs the budget; they must survive anyway
        let input = history(15, 2_000);
        let output = truncate(input.clone(), 1_000);

        let tail = &output[output.len() - 10..];
        assert_eq!(tail, &input[5..]);
    }

    #[test]
    fn test_prefix_pass_respects_budget_share() {
        let input = history(100, 1_000);
        let max = 20_000;
        let output = truncate(input, max);

        // First + prefix (without the unconditional recency window) must fit
        // within 80% of budget plus one message of slack
        let prefix = &output[..output.len() - 10];
        assert!(serialized_len(prefix) <= max * 8 / 10 + 1_100);
    }
}
