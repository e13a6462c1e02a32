//! Service configuration: loading, validation, sanitized projection.

mod loader;
mod types;
mod validate;

use thiserror::Error;

pub use loader::{load_config, load_config_from_str};
pub use types::{
    BuilderToolConfig, Config, DatabaseConfig, SanitizedBuilderToolConfig, SanitizedConfig,
    ServerConfig, WorkspaceConfig,
};
pub use validate::validate_config;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("config file not found: {0}")]
    FileNotFound(String),

    /// Configuration could not be parsed.
    #[error("failed to parse config: {0}")]
    ParseError(String),

    /// Configuration parsed but failed validation.
    #[error("invalid config: {0}")]
    ValidationError(String),
}
