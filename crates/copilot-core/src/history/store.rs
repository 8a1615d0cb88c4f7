//! Conversation persistence

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::Message;

/// Identifies one persisted conversation
///
/// `Service` is the singleton sidebar-chat session; `Flow` sessions are
/// per node instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    /// The shared service-mode conversation
    Service,
    /// A per-instance conversation, keyed by node id
    Flow(String),
}

impl SessionKey {
    /// The key under which this session is stored
    pub fn storage_key(&self) -> String {
        match self {
            SessionKey::Service => "copilot-service-history".to_string(),
            SessionKey::Flow(id) => format!("copilot-flow-history-{}", id),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

/// Persistence boundary for conversation histories
///
/// The host supplies the real backing store (a flow-engine context, a
/// database). Histories are owned by the caller between turns; a session
/// key must not be mutated by two concurrent turns.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load the history for a session, empty when none exists
    async fn load(&self, key: &SessionKey) -> Vec<Message>;

    /// Persist the history for a session
    ///
    /// Callers are expected to truncate before saving; the orchestrator
    /// routes every save through its truncating persist helper.
    async fn save(&self, key: &SessionKey, history: Vec<Message>);

    /// Drop the history for a session
    async fn clear(&self, key: &SessionKey);
}

/// In-memory conversation store
///
/// Stands in for the host context store in embedded use and in tests.
#[derive(Default)]
pub struct MemoryConversationStore {
    sessions: Mutex<HashMap<String, Vec<Message>>>,
}

impl MemoryConversationStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn load(&self, key: &SessionKey) -> Vec<Message> {
        self.sessions
            .lock()
            .get(&key.storage_key())
            .cloned()
            .unwrap_or_default()
    }

    async fn save(&self, key: &SessionKey, history: Vec<Message>) {
        self.sessions.lock().insert(key.storage_key(), history);
    }

    async fn clear(&self, key: &SessionKey) {
        self.sessions.lock().remove(&key.storage_key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys() {
        assert_eq!(SessionKey::Service.storage_key(), "copilot-service-history");
        assert_eq!(
            SessionKey::Flow("n42".to_string()).storage_key(),
            "copilot-flow-history-n42"
        );
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryConversationStore::new();
        let key = SessionKey::Flow("n1".to_string());

        assert!(store.load(&key).await.is_empty());

        store.save(&key, vec![Message::user("hi")]).await;
        let loaded = store.load(&key).await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content, "hi");

        store.clear(&key).await;
        assert!(store.load(&key).await.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = MemoryConversationStore::new();
        store
            .save(&SessionKey::Service, vec![Message::user("service")])
            .await;
        store
            .save(&SessionKey::Flow("a".to_string()), vec![Message::user("flow")])
            .await;

        assert_eq!(store.session_count(), 2);
        assert_eq!(store.load(&SessionKey::Service).await[0].content, "service");
    }
}
