//! Deserialization helpers for configuration values

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Read a timeout written as whole seconds
///
/// Use with `#[serde(deserialize_with = "secs")]`.
pub fn secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
