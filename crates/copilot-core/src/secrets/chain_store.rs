//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::traits::{SecretStore, SecretStoreResult};

/// A secret store that chains multiple stores together with fallback behavior
///
/// When reading, the chain tries each store in order and returns the first match.
/// When writing, the chain writes to the first store.
///
/// # Example
///
/// ```
/// use copilot_core::secrets::{SecretStore, ChainSecretStore, EnvSecretStore, MemorySecretStore};
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemorySecretStore::new());
/// let env = Arc::new(EnvSecretStore::new());
///
/// // Try memory first, then fall back to env
/// let chain = ChainSecretStore::new(vec![memory, env]);
/// ```
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl ChainSecretStore {
    /// Create a new chain store
    ///
    /// Stores are tried in order for reads; the first store receives writes.
    ///
    /// # Panics
    ///
    /// Panics if `stores` is empty.
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        assert!(
            !stores.is_empty(),
            "ChainSecretStore requires at least one store"
        );
        Self { stores }
    }

    /// The stores in this chain
    pub fn stores(&self) -> &[Arc<dyn SecretStore>] {
        &self.stores
    }

    /// Find which store has a key
    pub fn find_store(&self, key: &str) -> Option<&Arc<dyn SecretStore>> {
        self.stores
            .iter()
            .find(|store| store.is_available() && store.has(key))
    }
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn is_available(&self) -> bool {
        self.stores.iter().any(|s| s.is_available())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.stores
            .iter()
            .filter(|store| store.is_available())
            .find_map(|store| store.get(key))
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.stores[0].store(key, value)
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        // Best effort across every store holding the key; read-only stores
        // simply decline.
        let mut result = Ok(());
        for store in &self.stores {
            if store.has(key) {
                result = store.delete(key);
            }
        }
        result
    }
}
