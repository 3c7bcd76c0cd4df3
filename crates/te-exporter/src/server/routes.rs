//! Route handlers

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use te_core::{SelectionError, Target};

use crate::connector::Connector;
use crate::exposition;
use crate::state::Exporter;

/// Body of the 404 returned for an unknown `target`
pub const TARGET_NOT_CONFIGURED: &str = "Target not configured";

struct RouterState<C> {
    exporter: Arc<Exporter<C>>,
    metrics_path: Arc<str>,
}

impl<C> Clone for RouterState<C> {
    fn clone(&self) -> Self {
        Self {
            exporter: Arc::clone(&self.exporter),
            metrics_path: Arc::clone(&self.metrics_path),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetricsQuery {
    target: Option<String>,
}

/// Build the router for `exporter`
pub fn router<C: Connector>(exporter: Arc<Exporter<C>>, metrics_path: &str) -> Router {
    let state = RouterState {
        exporter,
        metrics_path: Arc::from(metrics_path),
    };

    Router::new()
        .route("/", get(landing::<C>))
        .route(metrics_path, get(metrics::<C>))
        .with_state(state)
}

async fn landing<C: Connector>(State(state): State<RouterState<C>>) -> Html<String> {
    Html(format!(
        r#"<html>
<head><title>Telnet Exporter</title></head>
<body>
<h1>Telnet Exporter</h1>
<p>Version {}</p>
<p><a href="{}">Metrics</a></p>
</body>
</html>
"#,
        env!("CARGO_PKG_VERSION"),
        state.metrics_path
    ))
}

async fn metrics<C: Connector>(
    State(state): State<RouterState<C>>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    let target = Target::from_request(query.target.as_deref());

    let samples = match state.exporter.scrape(&target).await {
        Ok(samples) => samples,
        Err(SelectionError::UnknownHost(host)) => {
            tracing::warn!(host = %host, "Scrape requested for unknown target");
            return (StatusCode::NOT_FOUND, TARGET_NOT_CONFIGURED).into_response();
        }
    };

    match exposition::encode(&samples) {
        Ok(body) => ([(header::CONTENT_TYPE, exposition::CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
