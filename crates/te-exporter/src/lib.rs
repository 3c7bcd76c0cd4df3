//! te-exporter: Prometheus exporter scraping remote hosts over Telnet
//!
//! Every scrape opens fresh Telnet sessions to the targeted hosts, runs
//! each host's configured commands in order and turns their output into
//! gauge samples. Hosts are collected in parallel; a per-host lock keeps
//! overlapping scrapes from interleaving sessions on the same host.

pub mod collector;
pub mod connector;
pub mod exposition;
pub mod server;
pub mod session;
pub mod state;

pub use collector::{Collector, HostLocks};
pub use connector::{Connector, TcpConnector};
pub use session::{Session, SessionState};
pub use state::Exporter;
