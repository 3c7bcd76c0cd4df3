//! Telnet stream with option refusal and timed marker scanning

use std::io::ErrorKind;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::ProtocolError;

/// Interpret As Command escape byte
pub const IAC: u8 = 255;
/// Refuse an option the peer offered to enable on our side
pub const DONT: u8 = 254;
/// Peer asks us to enable an option
pub const DO: u8 = 253;
/// Decline to enable an option
pub const WONT: u8 = 252;
/// Peer offers to enable an option on its side
pub const WILL: u8 = 251;

/// Terminator appended to every line we send
pub const LINE_TERMINATOR: &str = "\n";

/// Reply to a negotiation command, if one is due
///
/// `DO` is answered with `WONT` and `WILL` with `DONT`. Every other command
/// byte is ignored. Options are never accepted.
pub fn refusal(command: u8, option: u8) -> Option<[u8; 3]> {
    match command {
        DO => Some([IAC, WONT, option]),
        WILL => Some([IAC, DONT, option]),
        _ => None,
    }
}

/// Why a scan stopped without finding a marker
enum ScanError {
    Closed,
    Io(std::io::Error),
}

impl From<std::io::Error> for ScanError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::UnexpectedEof {
            ScanError::Closed
        } else {
            ScanError::Io(e)
        }
    }
}

/// A byte stream speaking the minimal Telnet dialect
///
/// Reads are buffered for the lifetime of the stream so bytes received
/// after a marker are kept for the next scan.
pub struct TelnetStream<S> {
    inner: BufReader<S>,
}

impl<S> TelnetStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    /// Get a reference to the underlying stream
    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }

    /// Consume the wrapper and return the underlying stream
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }

    /// Handle the remainder of a negotiation sequence after `IAC <command>`
    ///
    /// Reads the option byte and writes the refusal, if any.
    pub async fn negotiate(&mut self, command: u8) -> std::io::Result<()> {
        let option = self.inner.read_u8().await?;

        let Some(reply) = refusal(command, option) else {
            tracing::trace!(command, option, "Ignoring negotiation command");
            return Ok(());
        };

        tracing::trace!(command, option, "Refusing option");
        self.inner.write_all(&reply).await?;
        self.inner.flush().await
    }

    /// Read until any of `stops` appears in the accumulated text
    ///
    /// Returns the accumulated text on the first match. On deadline expiry or
    /// connection closure the text received so far is returned inside the
    /// error.
    pub async fn read_until(
        &mut self,
        stops: &[&str],
        timeout: Duration,
    ) -> Result<String, ProtocolError> {
        let mut buf = BytesMut::with_capacity(1024);

        let result = tokio::time::timeout(timeout, self.scan(stops, &mut buf)).await;
        let text = String::from_utf8_lossy(&buf).into_owned();

        match result {
            Ok(Ok(())) => Ok(text),
            Ok(Err(ScanError::Closed)) => Err(ProtocolError::Closed { partial: text }),
            Ok(Err(ScanError::Io(source))) => Err(ProtocolError::Read {
                partial: text,
                source,
            }),
            Err(_) => Err(ProtocolError::Timeout {
                timeout,
                partial: text,
            }),
        }
    }

    async fn scan(&mut self, stops: &[&str], buf: &mut BytesMut) -> Result<(), ScanError> {
        loop {
            let byte = self.inner.read_u8().await?;

            if byte == IAC {
                let command = self.inner.read_u8().await?;
                self.negotiate(command).await?;
                continue;
            }

            buf.put_u8(byte);

            // A new match can only end at the byte just appended
            if stops.iter().any(|stop| buf.ends_with(stop.as_bytes())) {
                return Ok(());
            }
        }
    }

    /// Write `line` followed by the line terminator
    pub async fn send_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let mut data = Vec::with_capacity(line.len() + LINE_TERMINATOR.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(LINE_TERMINATOR.as_bytes());

        self.inner
            .write_all(&data)
            .await
            .map_err(ProtocolError::Write)?;
        self.inner.flush().await.map_err(ProtocolError::Write)
    }

    /// Shut down the write half of the connection
    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        self.inner.shutdown().await
    }
}
