//! Telnet Exporter
//!
//! Serves Prometheus metrics scraped from remote hosts over Telnet.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use te_exporter::server::HttpServer;
use te_exporter::{Exporter, TcpConnector};

#[derive(Parser)]
#[command(name = "telnet-exporter")]
#[command(about = "Prometheus exporter for metrics scraped over Telnet")]
#[command(version)]
struct Args {
    /// Address to listen on for HTTP requests
    #[arg(short, long, env = "LISTEN_ADDRESS", default_value = "[::]:9342")]
    listen_address: String,

    /// Path under which metrics are exposed
    #[arg(long, env = "METRICS_PATH", default_value = "/metrics")]
    metrics_path: String,

    /// Path to configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "telnet-exporter.toml")]
    config_file: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Telnet exporter starting...");

    anyhow::ensure!(
        args.metrics_path.starts_with('/') && args.metrics_path != "/",
        "Metrics path must start with '/' and differ from the landing page: {}",
        args.metrics_path
    );

    let exporter = Exporter::from_file(&args.config_file, TcpConnector)
        .with_context(|| format!("Failed to load config from {:?}", args.config_file))?;
    tracing::info!(
        hosts = exporter.snapshot().await.len(),
        "Loaded configuration from {:?}",
        args.config_file
    );
    let exporter = Arc::new(exporter);

    let cancel = CancellationToken::new();

    // Setup signal handlers
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    #[cfg(unix)]
    spawn_reload_handler(Arc::clone(&exporter), cancel.clone());

    let server = HttpServer::new(exporter, args.metrics_path, cancel);
    server.run(&args.listen_address).await?;

    tracing::info!("Telnet exporter shutdown complete");
    Ok(())
}

/// Reload the configuration file on every SIGHUP
#[cfg(unix)]
fn spawn_reload_handler(exporter: Arc<Exporter<TcpConnector>>, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut hangup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
            .expect("failed to install signal handler");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tracing::info!("Received SIGHUP, reloading configuration...");
                    if let Err(e) = exporter.reload().await {
                        tracing::error!(error = %e, "Failed to reload configuration, keeping previous");
                    }
                }
            }
        }
    });
}
