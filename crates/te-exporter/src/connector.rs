//! Outbound connections to remote hosts

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use te_core::{ConnectionError, Host};

/// Opens byte streams to hosts
///
/// The collector only talks to the network through this trait, so tests
/// can substitute in-memory streams.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Stream type produced by this connector
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to `host`, bounded by its connect timeout
    async fn connect(&self, host: &Host) -> Result<Self::Stream, ConnectionError>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &Host) -> Result<TcpStream, ConnectionError> {
        let address = host.socket_address();

        let stream = match tokio::time::timeout(host.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ConnectionError::Dial { address, source }),
            Err(_) => {
                return Err(ConnectionError::DialTimeout {
                    address,
                    timeout: host.connect_timeout,
                })
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(host = %host.id, error = %e, "Failed to set TCP_NODELAY");
        }

        Ok(stream)
    }
}
