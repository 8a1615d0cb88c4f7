//! Configuration types and loading

mod file;
mod settings;

pub use file::{ConfigError, ConfigResult, FileConfigProvider};
pub use settings::{
    parse_args_string, parse_env_string, CopilotConfig, McpServerConfig, SessionMode,
};
