//! HTTP surface
//!
//! Serves a landing page on `/` and the Prometheus exposition on the
//! configured metrics path.

mod listener;
mod routes;

pub use listener::HttpServer;
pub use routes::{router, TARGET_NOT_CONFIGURED};
