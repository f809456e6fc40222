//! Error types for configuration loading and validation.

use std::path::PathBuf;

/// Errors that can occur when loading or validating `freshen.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that was opened.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The TOML content could not be parsed into the configuration shape.
    #[error("invalid freshen.toml: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but cannot be used.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Dotted name of the offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
