//! Parsing and validation of `freshen.toml` configuration files.
//!
//! This crate reads the optional project configuration file and produces a
//! strongly-typed [`FreshenConfig`] describing where the cache snapshot lives,
//! which prefix is stripped from cache keys, and which files a scan covers.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{
    load_config, load_config_file, load_config_from_str, load_config_or_default, CONFIG_FILE,
};
pub use types::*;
