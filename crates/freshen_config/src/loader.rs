//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::FreshenConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "freshen.toml";

/// Loads and validates `freshen.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<FreshenConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<FreshenConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Like [`load_config`], but returns the defaults when the project has no
/// `freshen.toml`.
pub fn load_config_or_default(project_dir: &Path) -> Result<FreshenConfig, ConfigError> {
    if project_dir.join(CONFIG_FILE).is_file() {
        load_config(project_dir)
    } else {
        Ok(FreshenConfig::default())
    }
}

/// Parses and validates a `freshen.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<FreshenConfig, ConfigError> {
    let config: FreshenConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that configuration values are usable.
fn validate_config(config: &FreshenConfig) -> Result<(), ConfigError> {
    if config.cache.snapshot.trim().is_empty() {
        return Err(ConfigError::Invalid {
            field: "cache.snapshot",
            reason: "must not be empty".to_string(),
        });
    }
    if let Some(ext) = config
        .scan
        .extensions
        .iter()
        .find(|ext| ext.is_empty() || ext.contains('.'))
    {
        return Err(ConfigError::Invalid {
            field: "scan.extensions",
            reason: format!("'{ext}' is not a bare extension such as \"js\""),
        });
    }
    Ok(())
}
