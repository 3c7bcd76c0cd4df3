//! te-core: Configuration, domain types and metric extraction
//!
//! This crate turns a configuration file into an immutable snapshot of
//! hosts, commands and compiled metric definitions, and turns raw command
//! output into metric samples.

pub mod config;
pub mod error;
pub mod extract;
pub mod types;

pub use config::{ConfigSnapshot, DescriptorRegistry, Host, MetricDefinition};
pub use error::{CommandError, ConfigError, ConnectionError, ExtractionError, SelectionError};
pub use types::{HostId, Sample, Target};
