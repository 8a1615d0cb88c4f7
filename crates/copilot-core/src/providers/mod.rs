//! LLM provider adapters
//!
//! One adapter per vendor family, all sharing the `ProviderAdapter`
//! contract and the same bounded tool-calling loop. The adapter is
//! selected once, at configuration time; an unknown provider name is a
//! hard configuration error.

mod anthropic;
mod driver;
mod error;
mod google;
mod mock;
mod openai;
mod sse;
mod traits;

pub use anthropic::AnthropicAdapter;
pub use error::{ProviderError, ProviderResult};
pub use google::GoogleAdapter;
pub use mock::{MockAdapter, MockMode};
pub use openai::OpenAiCompatibleAdapter;
pub use traits::{
    failure_notice, CallOptions, ChatOutcome, ProviderAdapter, ToolExecutor,
};

use crate::config::CopilotConfig;
use crate::logging::SharedLogger;

/// Create the adapter for a configuration
///
/// `api_key` is the resolved credential (inline config value or secret
/// store). Fails with `ProviderError::Unsupported` for unknown provider
/// names and with the corresponding config error when a credential or base
/// URL is missing.
pub fn create_adapter(
    config: &CopilotConfig,
    api_key: &str,
    logger: SharedLogger,
) -> ProviderResult<Box<dyn ProviderAdapter>> {
    let provider = config.provider.to_lowercase();

    if provider != "mock" && api_key.is_empty() {
        return Err(ProviderError::missing_api_key(&config.provider));
    }

    let adapter: Box<dyn ProviderAdapter> = match provider.as_str() {
        "openai" => Box::new(OpenAiCompatibleAdapter::openai(
            api_key,
            &config.model,
            logger,
        )),
        "deepseek" => Box::new(OpenAiCompatibleAdapter::deepseek(
            api_key,
            &config.model,
            logger,
        )),
        "custom" => {
            let base_url = config.custom_url.as_deref().ok_or_else(|| {
                ProviderError::MissingBaseUrl {
                    provider: "custom".to_string(),
                }
            })?;
            Box::new(OpenAiCompatibleAdapter::custom(
                base_url,
                api_key,
                &config.model,
                logger,
            ))
        }
        "azure" => {
            let base_url = config.custom_url.as_deref().ok_or_else(|| {
                ProviderError::MissingBaseUrl {
                    provider: "azure".to_string(),
                }
            })?;
            Box::new(OpenAiCompatibleAdapter::azure(
                base_url,
                api_key,
                &config.model,
                logger,
            ))
        }
        "google" | "gemini" => Box::new(GoogleAdapter::new(api_key, &config.model, logger)),
        "anthropic" | "claude" => Box::new(AnthropicAdapter::new(api_key, &config.model, logger)),
        "mock" => Box::new(MockAdapter::echo()),
        _ => return Err(ProviderError::Unsupported(config.provider.clone())),
    };

    Ok(adapter)
}

/// List all supported provider names
pub fn supported_providers() -> Vec<&'static str> {
    vec![
        "openai",
        "deepseek",
        "custom",
        "azure",
        "google",
        "anthropic",
        "mock",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use std::sync::Arc;

    fn logger() -> SharedLogger {
        Arc::new(NoOpLogger)
    }

    #[test]
    fn test_factory_selects_by_provider_name() {
        for (provider, expected) in [
            ("openai", "openai"),
            ("deepseek", "deepseek"),
            ("google", "google"),
            ("gemini", "google"),
            ("anthropic", "anthropic"),
            ("claude", "anthropic"),
        ] {
            let config = CopilotConfig::new(provider, "some-model");
            let adapter = create_adapter(&config, "key", logger()).unwrap();
            assert_eq!(adapter.name(), expected, "provider {}", provider);
        }
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let config = CopilotConfig::new("llamacpp", "m");
        let result = create_adapter(&config, "key", logger());
        assert!(matches!(result, Err(ProviderError::Unsupported(_))));
    }

    #[test]
    fn test_factory_requires_api_key() {
        let config = CopilotConfig::new("openai", "gpt-4.1");
        let result = create_adapter(&config, "", logger());
        assert!(matches!(result, Err(ProviderError::MissingApiKey { .. })));
    }

    #[test]
    fn test_custom_requires_base_url() {
        let config = CopilotConfig::new("custom", "local-model");
        let result = create_adapter(&config, "key", logger());
        assert!(matches!(result, Err(ProviderError::MissingBaseUrl { .. })));

        let config = config.with_custom_url("http://localhost:8080/v1");
        assert!(create_adapter(&config, "key", logger()).is_ok());
    }

    #[test]
    fn test_mock_needs_no_key() {
        let config = CopilotConfig::new("mock", "any");
        assert!(create_adapter(&config, "", logger()).is_ok());
    }

    #[test]
    fn test_provider_names_are_case_insensitive() {
        let config = CopilotConfig::new("OpenAI", "gpt-4.1");
        let adapter = create_adapter(&config, "key", logger()).unwrap();
        assert_eq!(adapter.name(), "openai");
    }

    #[test]
    fn test_supported_list_is_consistent_with_factory() {
        for provider in supported_providers() {
            let mut config = CopilotConfig::new(provider, "m");
            config.custom_url = Some("http://localhost/v1".to_string());
            assert!(
                create_adapter(&config, "key", logger()).is_ok(),
                "provider {} should construct",
                provider
            );
        }
    }
}
