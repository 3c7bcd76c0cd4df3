//! Configuration file schema

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::serde_utils::secs;

/// Default Telnet port
pub const DEFAULT_PORT: u16 = 23;
/// Default dial timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default value of the `command_timeout` key
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(20);
/// Default prompt marker
pub const DEFAULT_PROMPT: &str = "#";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExporterConfig {
    /// Hosts keyed by identity; the key is also the address dialed
    #[serde(default)]
    pub hosts: BTreeMap<String, HostConfig>,
}

/// Settings for one remote host
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    /// Telnet port (0 falls back to the default)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username sent when a login banner is seen
    #[serde(default)]
    pub username: String,

    /// Password sent after the username
    #[serde(default)]
    pub password: String,

    /// Dial timeout in seconds
    #[serde(default = "default_connect_timeout", deserialize_with = "secs")]
    pub connect_timeout: Duration,

    /// Command timeout in seconds. Accepted for compatibility with existing
    /// files; sessions use fixed read timeouts.
    #[serde(default = "default_command_timeout", deserialize_with = "secs")]
    pub command_timeout: Duration,

    /// Marker that ends a command's output. An empty prompt sends commands
    /// without reading any output.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Labels added to every metric of this host
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Commands run in order on every collection
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            prompt: DEFAULT_PROMPT.to_string(),
            labels: BTreeMap::new(),
            commands: Vec::new(),
        }
    }
}

/// A command and the metrics extracted from its output
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Literal text sent to the host
    pub command: String,

    /// Metrics keyed by metric name
    #[serde(default)]
    pub metrics: BTreeMap<String, MetricConfig>,
}

/// A metric extracted from command output by regex
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricConfig {
    /// Pattern applied once to the command output
    pub regex: String,

    /// Help text; defaults to the metric name
    #[serde(default)]
    pub help: String,

    /// Static labels; host labels are merged in and win on collision
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,

    /// Label names filled from named capture groups
    #[serde(default)]
    pub dynamic_labels: Option<Vec<String>>,

    /// Label name carrying the captured value instead of a number
    #[serde(default)]
    pub value_as_label: Option<String>,

    /// Known values for one-hot encoding of `value_as_label`
    #[serde(default)]
    pub value_enum: Option<Vec<String>>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_command_timeout() -> Duration {
    DEFAULT_COMMAND_TIMEOUT
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}
