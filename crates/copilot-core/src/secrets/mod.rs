//! Secret storage abstractions
//!
//! Secure persistence is out of scope; the host provides credentials and
//! this crate resolves them through the `SecretStore` chain.

mod chain_store;
mod env_store;
mod memory_store;
mod traits;

pub use chain_store::ChainSecretStore;
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use traits::{SecretStore, SecretStoreError, SecretStoreResult};
