//! HTTP listener

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::connector::Connector;
use crate::server::routes::router;
use crate::state::Exporter;

/// HTTP server exposing the exporter
pub struct HttpServer<C> {
    exporter: Arc<Exporter<C>>,
    metrics_path: String,
    cancel: CancellationToken,
}

impl<C: Connector> HttpServer<C> {
    /// Create a new HTTP server
    pub fn new(exporter: Arc<Exporter<C>>, metrics_path: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            exporter,
            metrics_path: metrics_path.into(),
            cancel,
        }
    }

    /// Serve until the cancellation token fires
    pub async fn run(&self, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;

        let local_addr = listener.local_addr()?;
        tracing::info!("HTTP server listening on {}", local_addr);

        let app = router(Arc::clone(&self.exporter), &self.metrics_path);
        let cancel = self.cancel.clone();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server failed")?;

        Ok(())
    }
}
