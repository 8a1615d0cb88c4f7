//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Secret store backed by an in-memory map
///
/// Useful for tests and for hosts that inject credentials at runtime (the
/// node's credential field, for example) rather than persisting them here.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries
    pub fn with_secrets(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            secrets: RwLock::new(entries.into_iter().collect()),
        }
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.secrets.read().is_empty()
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        match self.secrets.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(SecretStoreError::NotFound(key.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());

        store.store("openai", "sk-abc").unwrap();
        assert_eq!(store.get("openai"), Some("sk-abc".to_string()));
        assert_eq!(store.len(), 1);

        store.delete("openai").unwrap();
        assert_eq!(store.get("openai"), None);
    }

    #[test]
    fn test_memory_store_delete_missing() {
        let store = MemorySecretStore::new();
        assert!(matches!(
            store.delete("nope"),
            Err(SecretStoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_memory_store_prepopulated() {
        let store = MemorySecretStore::with_secrets([("google".to_string(), "key".to_string())]);
        assert!(store.has("google"));
        assert!(!store.has("openai"));
    }
}
