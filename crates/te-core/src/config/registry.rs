//! Process-wide registry of metric descriptors

use std::collections::HashMap;
use std::sync::Arc;

use prometheus::core::Desc;

/// Name of the per-host liveness gauge
pub const UP_METRIC: &str = "telnet_exporter_up";
/// Help text of the per-host liveness gauge
pub const UP_HELP: &str = "1 if an Telnet connection can be established";

/// Append-only registry of metric descriptors
///
/// Descriptors are interned by identity (name and constant label values)
/// and dimensions (label names and help). Compiling a configuration twice
/// against the same registry yields the same `Arc<Desc>` instances, so
/// reloads never recreate a descriptor that already exists.
pub struct DescriptorRegistry {
    /// Descriptors in registration order
    entries: Vec<Arc<Desc>>,
    /// (id, dim_hash) to position in `entries`
    index: HashMap<(u64, u64), usize>,
    /// Liveness descriptor
    up: Arc<Desc>,
}

impl DescriptorRegistry {
    /// Create a registry holding only the liveness descriptor
    pub fn new() -> Result<Self, prometheus::Error> {
        let up = Desc::new(
            UP_METRIC.to_string(),
            UP_HELP.to_string(),
            vec!["target".to_string()],
            HashMap::new(),
        )?;

        let mut registry = Self {
            entries: Vec::new(),
            index: HashMap::new(),
            up: Arc::new(up),
        };
        let up = Arc::clone(&registry.up);
        registry.index.insert((up.id, up.dim_hash), 0);
        registry.entries.push(up);
        Ok(registry)
    }

    /// Return the registered descriptor equal to `desc`, registering it if new
    pub fn intern(&mut self, desc: Desc) -> Arc<Desc> {
        let key = (desc.id, desc.dim_hash);
        if let Some(&pos) = self.index.get(&key) {
            return Arc::clone(&self.entries[pos]);
        }

        let desc = Arc::new(desc);
        self.index.insert(key, self.entries.len());
        self.entries.push(Arc::clone(&desc));
        desc
    }

    /// The liveness descriptor
    pub fn up(&self) -> &Arc<Desc> {
        &self.up
    }

    /// All descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Desc>> {
        self.entries.iter()
    }

    /// Number of registered descriptors
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
