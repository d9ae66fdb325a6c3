//! Parsing and validation of `verdict.toml` cache configuration files.
//!
//! Configuration is a plain value handed to the cache and to the external
//! compiler at construction time. Nothing here is process-global.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
