//! te-protocol: Minimal Telnet transport for telnet-exporter
//!
//! This crate speaks just enough of the Telnet wire protocol to survive
//! option negotiation (every offered option is refused) and to scan the
//! byte stream until one of a set of markers shows up.

pub mod error;
pub mod telnet;

pub use error::ProtocolError;
pub use telnet::{refusal, TelnetStream, DO, DONT, IAC, LINE_TERMINATOR, WILL, WONT};
