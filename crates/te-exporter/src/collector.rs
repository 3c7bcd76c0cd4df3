//! Collection orchestrator
//!
//! A collection wave fans out one task per targeted host and waits for all
//! of them. Within a host everything runs sequentially: connect, optional
//! login, then every command in configured order.
//!
//! # Per-host exclusion
//!
//! Each host has one lock in [`HostLocks`], keyed by host identity and owned
//! by the collector rather than by the configuration. A host's task holds
//! the lock for its whole cycle, so overlapping scrapes never run two
//! sessions against the same host. Locks outlive configuration reloads.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use futures::future::join_all;
use prometheus::core::Desc;
use tokio::sync::Mutex;

use te_core::config::{Command, ConfigSnapshot, Host};
use te_core::extract::extract;
use te_core::{HostId, Sample, SelectionError, Target};

use crate::connector::{Connector, TcpConnector};
use crate::session::Session;

/// Registry of per-host locks
///
/// Entries are never removed; a host dropped by a reload keeps its lock
/// until the process exits. The registry is bounded by the number of hosts
/// ever configured.
#[derive(Default)]
pub struct HostLocks {
    locks: DashMap<HostId, Arc<Mutex<()>>>,
}

impl HostLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Get the lock for a host, creating it on first use
    pub fn get(&self, id: &HostId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Number of hosts with a lock
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Check if no lock was created yet
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Runs collection waves against configured hosts
pub struct Collector<C = TcpConnector> {
    connector: Arc<C>,
    locks: Arc<HostLocks>,
}

impl<C: Connector> Collector<C> {
    /// Create a collector dialing through `connector`
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            locks: Arc::new(HostLocks::new()),
        }
    }

    /// The per-host lock registry
    pub fn locks(&self) -> &HostLocks {
        &self.locks
    }

    /// Collect every host covered by `target`
    ///
    /// An unknown target host is returned as an error without contacting
    /// any host.
    pub async fn collect(
        &self,
        snapshot: &ConfigSnapshot,
        target: &Target,
    ) -> Result<Vec<Sample>, SelectionError> {
        let hosts = snapshot.select(target)?;
        Ok(self
            .collect_hosts(hosts, Arc::clone(snapshot.up_descriptor()))
            .await)
    }

    /// Collect `hosts` in parallel and concatenate their samples
    ///
    /// Each host contributes its liveness sample first, followed by its
    /// command samples in command order. Hosts appear in input order.
    pub async fn collect_hosts(&self, hosts: Vec<Arc<Host>>, up: Arc<Desc>) -> Vec<Sample> {
        tracing::debug!(hosts = hosts.len(), "Starting collection for hosts");

        let tasks: Vec<_> = hosts
            .iter()
            .map(|host| {
                let connector = Arc::clone(&self.connector);
                let lock = self.locks.get(&host.id);
                let host = Arc::clone(host);
                let up = Arc::clone(&up);

                tokio::spawn(async move {
                    let _guard = lock.lock_owned().await;
                    collect_host(connector.as_ref(), host, &up).await
                })
            })
            .collect();

        let results = join_all(tasks).await;

        let mut samples = Vec::new();
        for (host, result) in hosts.iter().zip(results) {
            match result {
                Ok(host_samples) => samples.extend(host_samples),
                Err(e) => {
                    tracing::error!(host = %host.id, error = %e, "Collection task failed");
                    samples.push(liveness(&up, host, false));
                }
            }
        }
        samples
    }
}

fn liveness(up: &Arc<Desc>, host: &Host, connected: bool) -> Sample {
    let value = if connected { 1.0 } else { 0.0 };
    Sample::new(Arc::clone(up), vec![host.id.to_string()], value)
}

/// One host's full cycle; the caller holds the host's lock
async fn collect_host<C: Connector>(connector: &C, host: Arc<Host>, up: &Arc<Desc>) -> Vec<Sample> {
    let started = Instant::now();

    let mut session = match Session::open(connector, Arc::clone(&host)).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(host = %host.id, error = %e, "Failed to connect to host");
            return vec![liveness(up, &host, false)];
        }
    };

    let mut samples = vec![liveness(up, &host, true)];

    for command in &host.commands {
        collect_command(&mut session, &host, command, &mut samples).await;
    }

    session.close().await;

    tracing::debug!(
        host = %host.id,
        duration_ms = started.elapsed().as_millis() as u64,
        "Finished collection for host"
    );
    samples
}

async fn collect_command<S>(
    session: &mut Session<S>,
    host: &Host,
    command: &Command,
    samples: &mut Vec<Sample>,
) where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    let output = match session.execute(&command.text).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(host = %host.id, command = %command.text, error = %e, "Failed to send command");
            return;
        }
    };

    tracing::debug!(host = %host.id, command = %command.text, output = %output, "Received command output");

    for metric in command.metrics.values() {
        match extract(metric, &output) {
            Ok(extracted) => samples.extend(extracted),
            Err(e) => {
                tracing::error!(host = %host.id, command = %command.text, metric = %metric.name, error = %e, "Failed to extract metric");
            }
        }
    }
}
