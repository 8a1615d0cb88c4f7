//! File-based configuration loading (YAML)
//!
//! Supports an explicit path or the user-level default
//! (~/.config/copilot/config.yaml).

use std::fs;
use std::path::{Path, PathBuf};

use super::settings::CopilotConfig;

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Loads `CopilotConfig` from a YAML file
///
/// # Example
///
/// ```no_run
/// use copilot_core::config::FileConfigProvider;
///
/// let provider = FileConfigProvider::user();
/// let config = provider.load().unwrap();
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
}

impl FileConfigProvider {
    /// Create a provider for a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a user-level provider (~/.config/copilot/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
        Self::new(config_dir.join("copilot").join("config.yaml"))
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the config, falling back to defaults when the file is absent
    pub fn load(&self) -> ConfigResult<CopilotConfig> {
        if !self.path.exists() {
            return Ok(CopilotConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write the config back out, creating parent directories as needed
    pub fn save(&self, config: &CopilotConfig) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(config)
            .map_err(|e| ConfigError::Other(format!("Failed to serialize config: {}", e)))?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
