//! Shared exporter state

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use te_core::config::{self, DescriptorRegistry};
use te_core::{ConfigError, ConfigSnapshot, Sample, SelectionError, Target};

use crate::collector::Collector;
use crate::connector::{Connector, TcpConnector};

/// Global state for the exporter
///
/// Scrapes take a clone of the current snapshot and never block reloads;
/// a reload swaps in a new snapshot only after it compiled successfully.
pub struct Exporter<C = TcpConnector> {
    snapshot: RwLock<Arc<ConfigSnapshot>>,
    registry: Mutex<DescriptorRegistry>,
    collector: Collector<C>,
    config_path: Option<PathBuf>,
}

impl<C: Connector> Exporter<C> {
    /// Create exporter state from an already compiled snapshot
    ///
    /// `registry` must be the registry the snapshot was compiled with, so
    /// that reloads keep handing out the same descriptors.
    pub fn new(snapshot: ConfigSnapshot, registry: DescriptorRegistry, connector: C) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
            registry: Mutex::new(registry),
            collector: Collector::new(connector),
            config_path: None,
        }
    }

    /// Remember the file to re-read on [`Exporter::reload`]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Load and compile `path` and build the exporter from it
    pub fn from_file(path: &Path, connector: C) -> Result<Self, ConfigError> {
        let mut registry = DescriptorRegistry::new().map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let snapshot = config::load_snapshot(path, &mut registry)?;
        Ok(Self::new(snapshot, registry, connector).with_config_path(path))
    }

    /// Current configuration snapshot
    pub async fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// The collection orchestrator
    pub fn collector(&self) -> &Collector<C> {
        &self.collector
    }

    /// Run one collection wave against `target`
    pub async fn scrape(&self, target: &Target) -> Result<Vec<Sample>, SelectionError> {
        let snapshot = self.snapshot().await;
        self.collector.collect(&snapshot, target).await
    }

    /// Re-read the configuration file and swap in the new snapshot
    ///
    /// On failure the previous snapshot stays active. Returns the number of
    /// configured hosts.
    pub async fn reload(&self) -> Result<usize, ConfigError> {
        let Some(path) = &self.config_path else {
            return Err(ConfigError::Invalid(
                "no configuration file to reload".to_string(),
            ));
        };

        let snapshot = {
            let mut registry = self.registry.lock().await;
            config::load_snapshot(path, &mut registry)?
        };
        let hosts = snapshot.len();

        *self.snapshot.write().await = Arc::new(snapshot);
        tracing::info!(path = ?path, hosts, "Reloaded configuration");
        Ok(hosts)
    }
}
