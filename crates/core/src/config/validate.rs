use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Builder and keytool paths are non-empty
/// - Proxy base URL is an absolute http(s) URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.builder.builder_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "builder.builder_path cannot be empty".to_string(),
        ));
    }

    if config.builder.keytool_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "builder.keytool_path cannot be empty".to_string(),
        ));
    }

    if !config.builder.proxy_base_url.starts_with("http://")
        && !config.builder.proxy_base_url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(
            "builder.proxy_base_url must be an absolute http(s) URL".to_string(),
        ));
    }

    Ok(())
}
