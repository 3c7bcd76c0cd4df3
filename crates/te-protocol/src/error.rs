//! Transport error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to a Telnet peer
///
/// Read failures carry whatever text was accumulated before the failure.
/// That text is useful for logging but never counts as a marker match.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// No marker arrived before the deadline
    #[error("Read timed out after {timeout:?}")]
    Timeout { timeout: Duration, partial: String },

    /// Peer closed the connection before a marker arrived
    #[error("Connection closed by peer")]
    Closed { partial: String },

    /// I/O error while reading
    #[error("Read failed: {source}")]
    Read {
        partial: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while writing
    #[error("Write failed: {0}")]
    Write(#[source] std::io::Error),
}

impl ProtocolError {
    /// Text received before the failure, if this was a read failure
    pub fn partial(&self) -> Option<&str> {
        match self {
            ProtocolError::Timeout { partial, .. }
            | ProtocolError::Closed { partial }
            | ProtocolError::Read { partial, .. } => Some(partial),
            ProtocolError::Write(_) => None,
        }
    }

    /// Whether the read deadline expired
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::Timeout { .. })
    }
}
