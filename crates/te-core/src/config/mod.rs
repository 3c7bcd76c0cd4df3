//! Configuration management for telnet-exporter
//!
//! The file format is TOML. Loading parses the file into [`ExporterConfig`];
//! compiling turns that into an immutable [`ConfigSnapshot`] with regexes
//! compiled, labels merged and metric descriptors interned.

mod host;
mod registry;
mod serde_utils;
mod snapshot;

pub use host::{
    CommandConfig, ExporterConfig, HostConfig, MetricConfig, DEFAULT_COMMAND_TIMEOUT,
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, DEFAULT_PROMPT,
};
pub use registry::{DescriptorRegistry, UP_HELP, UP_METRIC};
pub use snapshot::{merge_labels, Command, ConfigSnapshot, Host, MetricDefinition};

use crate::error::ConfigError;
use std::path::Path;

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Load and compile a configuration file in one step
pub fn load_snapshot(
    path: &Path,
    registry: &mut DescriptorRegistry,
) -> Result<ConfigSnapshot, ConfigError> {
    let config: ExporterConfig = load_config(path)?;
    config.compile(registry)
}
