//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::VerdictConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "verdict.toml";

/// Loads and validates a `verdict.toml` configuration from a directory.
pub fn load_config(dir: &Path) -> Result<VerdictConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a `verdict.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<VerdictConfig, ConfigError> {
    let config: VerdictConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &VerdictConfig) -> Result<(), ConfigError> {
    if config.cache.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.cache_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}
