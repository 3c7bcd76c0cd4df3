//! Core domain types

use std::fmt;
use std::sync::Arc;

use prometheus::core::Desc;

/// Identity of a configured host
///
/// The identity doubles as the network address the host is dialed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(pub String);

impl HostId {
    /// Create a new host ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for HostId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Which hosts a collection wave targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every configured host
    All,
    /// A single host by identity
    Host(HostId),
}

impl Target {
    /// Build a target from an optional requested host name
    pub fn from_request(host: Option<&str>) -> Self {
        match host {
            Some(name) if !name.is_empty() => Target::Host(HostId::new(name)),
            _ => Target::All,
        }
    }
}

/// One gauge value produced by a collection wave
#[derive(Debug, Clone)]
pub struct Sample {
    /// Descriptor created at configuration load
    pub desc: Arc<Desc>,
    /// Values for the descriptor's variable labels, in declared order
    pub label_values: Vec<String>,
    /// Gauge value
    pub value: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(desc: Arc<Desc>, label_values: Vec<String>, value: f64) -> Self {
        Self {
            desc,
            label_values,
            value,
        }
    }

    /// Metric name of the sample
    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    /// Value of the named label, variable or constant
    pub fn label(&self, name: &str) -> Option<&str> {
        if let Some(value) = self
            .desc
            .variable_labels
            .iter()
            .position(|l| l == name)
            .and_then(|i| self.label_values.get(i))
        {
            return Some(value);
        }

        self.desc
            .const_label_pairs
            .iter()
            .find(|pair| pair.get_name() == name)
            .map(|pair| pair.get_value())
    }
}
