//! Provider error types

use thiserror::Error;

/// Errors that can occur during provider operations
///
/// `Unsupported`, `MissingApiKey` and `MissingBaseUrl` are configuration
/// errors raised at adapter construction and are the only variants callers
/// ever see as hard failures; call-time variants are converted into a
/// failure `ChatOutcome` at the adapter boundary.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Unknown provider name in the configuration
    #[error("Unsupported LLM provider: {0}")]
    Unsupported(String),

    /// Missing API key
    #[error("API key not configured, please set {provider} API key in node configuration")]
    MissingApiKey { provider: String },

    /// Provider requires an explicit base URL
    #[error("API URL is required for {provider}")]
    MissingBaseUrl { provider: String },

    /// API request failed
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid response from provider
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Stream ended unexpectedly
    #[error("Stream ended unexpectedly")]
    StreamEnded,
}

impl ProviderError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
