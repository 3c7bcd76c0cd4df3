//! Error types for telnet-exporter
//!
//! Only [`ConfigError`] is fatal. Every other error abandons the smallest
//! unit it applies to: a host, a command or a single metric.

use std::path::PathBuf;
use std::time::Duration;

use te_protocol::ProtocolError;
use thiserror::Error;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A metric regex failed to compile
    #[error("Could not compile regex (host='{host}', command='{command}', metric='{metric}') '{regex}': {source}")]
    Regex {
        host: String,
        command: String,
        metric: String,
        regex: String,
        #[source]
        source: regex::Error,
    },

    /// A metric descriptor was rejected (bad name, bad or duplicate labels)
    #[error("Invalid metric (host='{host}', command='{command}', metric='{metric}'): {source}")]
    Descriptor {
        host: String,
        command: String,
        metric: String,
        #[source]
        source: prometheus::Error,
    },

    /// A variable label shadows a constant label
    #[error("Label '{label}' is both static and dynamic (host='{host}', command='{command}', metric='{metric}')")]
    LabelConflict {
        host: String,
        command: String,
        metric: String,
        label: String,
    },

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Host-level failures; the host is reported down and its commands skipped
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// TCP connect failed
    #[error("Failed to connect to {address}: {source}")]
    Dial {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not finish in time
    #[error("Connecting to {address} timed out after {timeout:?}")]
    DialTimeout { address: String, timeout: Duration },

    /// No prompt or login banner arrived after connecting
    #[error("No initial prompt: {0}")]
    InitialPrompt(#[source] ProtocolError),
}

/// Command-level failures; only the failing command's metrics are skipped
#[derive(Error, Debug)]
pub enum CommandError {
    /// Sending the command or reading its output failed
    #[error("Command '{command}' failed: {source}")]
    Transport {
        command: String,
        #[source]
        source: ProtocolError,
    },
}

/// Metric-level failures
#[derive(Error, Debug, PartialEq)]
pub enum ExtractionError {
    /// Metrics with dynamic labels must capture their value in a `value` group
    #[error("Must define a 'value' match group for metric '{metric}' when using dynamic labels")]
    MissingValueGroup { metric: String },

    /// Metrics without dynamic labels take their value from the first group
    #[error("Regex for metric '{metric}' has no capture group")]
    MissingCaptureGroup { metric: String },

    /// Captured text is not a number
    #[error("Could not parse '{value}' as float")]
    InvalidNumber { value: String },
}

/// Caller-visible selection errors
#[derive(Error, Debug, PartialEq)]
pub enum SelectionError {
    /// The requested host is not configured
    #[error("Target not configured: {0}")]
    UnknownHost(String),
}
