//! Configuration management module
//!
//! Provides [`RuntimeConfig`] which combines the static TOML configuration
//! with the four YAML documents kept in the data directory.

mod runtime_config;
mod store;

pub(crate) use runtime_config::RuntimeConfig;
pub(crate) use store::YamlDocument;
