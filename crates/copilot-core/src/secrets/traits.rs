//! Core traits and types for secret storage

use thiserror::Error;

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Secret not found: {0}")]
    NotFound(String),

    #[error("Store not available: {0}")]
    NotAvailable(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Trait for secret storage implementations
///
/// Implementations can be:
/// - Environment variables (`EnvSecretStore`)
/// - In-memory for testing and host-provided credentials (`MemorySecretStore`)
/// - Chained for fallback behavior (`ChainSecretStore`)
///
/// Secure persistence is the host's concern; this crate only consumes the
/// abstraction.
///
/// # Example
///
/// ```
/// use copilot_core::secrets::{SecretStore, EnvSecretStore};
///
/// let store = EnvSecretStore::new();
/// // store.get("openai") will check OPENAI_API_KEY
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Check if this store is available
    fn is_available(&self) -> bool {
        true
    }

    /// Retrieve a secret by key
    ///
    /// The key can be:
    /// - A provider name (e.g., "openai") which gets mapped to the appropriate env var
    /// - A direct key (e.g., "OPENAI_API_KEY")
    fn get(&self, key: &str) -> Option<String>;

    /// Store a secret
    ///
    /// Returns `Err(SecretStoreError::ReadOnly)` if the store doesn't support writing.
    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Delete a secret
    ///
    /// Returns `Err(SecretStoreError::ReadOnly)` if the store doesn't support deletion.
    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    /// Check if a secret exists
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
