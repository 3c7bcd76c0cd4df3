//! Per-host Telnet sessions
//!
//! A session goes Connected -> (Authenticated) -> Ready -> Closed within a
//! single collection cycle. Sessions are never pooled.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use te_core::{CommandError, ConnectionError, Host};
use te_protocol::{ProtocolError, TelnetStream};

use crate::connector::Connector;

/// Markers that end the wait for initial output after connecting
pub const INITIAL_MARKERS: [&str; 5] = [">", "$", "#", LOGIN_MARKER, PASSWORD_MARKER];

/// Upper bound on the wait for initial output
pub const INITIAL_OUTPUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between sending a line and reading its output
pub const SETTLE_INTERVAL: Duration = Duration::from_millis(500);

/// Read timeout for a command's output
pub const COMMAND_READ_TIMEOUT: Duration = Duration::from_secs(3);

const LOGIN_MARKER: &str = "login";
const PASSWORD_MARKER: &str = "Password";
const LOGGED_IN_MARKER: &str = "#";

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// TCP connected, initial output not yet seen
    Connected,
    /// Login handshake performed (not necessarily successful)
    Authenticated,
    /// Ready for commands
    Ready,
    /// Connection shut down
    Closed,
}

/// A Telnet session to one host
pub struct Session<S> {
    host: Arc<Host>,
    stream: TelnetStream<S>,
    state: SessionState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Connect to `host` and bring the session to Ready
    pub async fn open<C>(connector: &C, host: Arc<Host>) -> Result<Self, ConnectionError>
    where
        C: Connector<Stream = S>,
    {
        let stream = connector.connect(&host).await?;
        Self::establish(host, stream).await
    }

    /// Bring an already connected stream to Ready
    ///
    /// Waits for a prompt or login banner. When a banner asks for
    /// credentials the username and password are sent; the outcome of that
    /// handshake is logged but does not fail the session.
    pub async fn establish(host: Arc<Host>, stream: S) -> Result<Self, ConnectionError> {
        let mut session = Self {
            host,
            stream: TelnetStream::new(stream),
            state: SessionState::Connected,
        };

        let output = match session
            .stream
            .read_until(&INITIAL_MARKERS, INITIAL_OUTPUT_TIMEOUT)
            .await
        {
            Ok(output) => output,
            Err(e) => {
                session.close().await;
                return Err(ConnectionError::InitialPrompt(e));
            }
        };

        tracing::debug!(host = %session.host.id, output = %output, "Received initial output");

        if output.contains(LOGIN_MARKER) || output.contains(PASSWORD_MARKER) {
            session.login().await;
        }

        session.state = SessionState::Ready;
        Ok(session)
    }

    async fn login(&mut self) {
        let host = Arc::clone(&self.host);
        tracing::debug!(host = %host.id, "Login prompt detected");

        match self.exchange(&host.username, PASSWORD_MARKER).await {
            Ok(output) => tracing::debug!(host = %host.id, output = %output, "Sent username"),
            Err(e) => tracing::debug!(host = %host.id, error = %e, partial = ?e.partial(), "No password prompt after username"),
        }

        match self.exchange(&host.password, LOGGED_IN_MARKER).await {
            Ok(output) => tracing::debug!(host = %host.id, output = %output, "Sent password"),
            Err(e) => tracing::debug!(host = %host.id, error = %e, partial = ?e.partial(), "No prompt after password"),
        }

        self.state = SessionState::Authenticated;
    }

    /// Run one command and return its output
    ///
    /// With an empty prompt the command is sent without reading any output.
    /// Otherwise the output is read for at most [`COMMAND_READ_TIMEOUT`].
    pub async fn execute(&mut self, command: &str) -> Result<String, CommandError> {
        let host = Arc::clone(&self.host);

        self.exchange(command, &host.prompt)
            .await
            .map_err(|source| CommandError::Transport {
                command: command.to_string(),
                source,
            })
    }

    /// Send a line, let output settle, then read until `marker`
    async fn exchange(&mut self, line: &str, marker: &str) -> Result<String, ProtocolError> {
        self.stream.send_line(line).await?;

        tokio::time::sleep(SETTLE_INTERVAL).await;

        if marker.is_empty() {
            return Ok(String::new());
        }

        self.stream.read_until(&[marker], COMMAND_READ_TIMEOUT).await
    }

    /// Shut down the connection
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(host = %self.host.id, error = %e, "Error shutting down session");
        }
        self.state = SessionState::Closed;
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Host this session talks to
    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }
}
