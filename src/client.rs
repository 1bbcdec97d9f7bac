//! Reconnecting peer client
//!
//! Owns one outbound connection to the coordinator. Connection establishment
//! retries forever with a bounded per-attempt timeout; once connected, a full
//! run sends exactly one framed message and reads exactly one framed response.

use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::framing::{self, FrameError};

/// Words a demo peer picks from when no message is given on the command line
const VOCABULARY: &[&str] = &[
    "Hello",
    "World",
    "Rust",
    "Async",
    "Network",
    "Message",
    "Client",
    "Server",
    "Coordinator",
    "Telegram",
    "Bot",
    "API",
    "Connection",
    "Socket",
    "Protocol",
    "Data",
    "Stream",
    "Buffer",
];

/// Pick a random demo payload
pub fn random_payload() -> String {
    use rand::seq::IndexedRandom;

    let mut rng = rand::rng();
    VOCABULARY.choose(&mut rng).unwrap_or(&"Hello").to_string()
}

/// Errors surfaced by send/receive operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client is not connected")]
    NotConnected,

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("response is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    Closed,
}

/// TCP client that retries connection establishment indefinitely
///
/// Send and receive failures mark the connection unusable
/// ([`ClientState::Disconnected`]) and surface the error; the operations
/// themselves are never retried automatically.
pub struct ReconnectingClient {
    host: String,
    port: u16,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    stream: Option<TcpStream>,
    state: ClientState,
    attempts: u64,
}

impl ReconnectingClient {
    /// Create a client dialing `host:port` with the given retry policy
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration, reconnect_delay: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
            reconnect_delay,
            stream: None,
            state: ClientState::Disconnected,
            attempts: 0,
        }
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.host.clone(),
            config.port,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.reconnect_delay_secs),
        )
    }

    /// Current lifecycle state
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Connect attempts made by the most recent [`connect`](Self::connect) call
    pub fn connect_attempts(&self) -> u64 {
        self.attempts
    }

    /// Establish the connection, retrying forever
    ///
    /// Each attempt is bounded by the connect timeout; failures are logged and
    /// followed by a fixed delay. Returns only once connected — the sole way
    /// out is process termination.
    pub async fn connect(&mut self) {
        self.state = ClientState::Connecting;
        self.attempts = 0;

        loop {
            self.attempts += 1;
            let attempt = self.attempts;
            debug!(attempt, host = %self.host, port = self.port, "attempting connection");

            match tokio::time::timeout(self.connect_timeout, TcpStream::connect((self.host.as_str(), self.port))).await
            {
                Ok(Ok(stream)) => {
                    info!(attempt, host = %self.host, port = self.port, "connected to coordinator");
                    self.stream = Some(stream);
                    self.state = ClientState::Connected;
                    return;
                }
                Ok(Err(e)) => warn!(attempt, error = %e, "connection failed"),
                Err(_) => warn!(attempt, timeout = ?self.connect_timeout, "connection attempt timed out"),
            }

            debug!(delay = ?self.reconnect_delay, "retrying after delay");
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Send one framed message
    ///
    /// Only valid when connected. Any transport failure marks the client
    /// disconnected; the caller decides whether the run can continue.
    pub async fn send_message(&mut self, text: &str) -> Result<(), ClientError> {
        if self.state != ClientState::Connected {
            return Err(ClientError::NotConnected);
        }
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        match framing::write_frame(stream, text.as_bytes()).await {
            Ok(()) => {
                debug!(len = text.len(), "message sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to send message");
                self.mark_disconnected();
                Err(e.into())
            }
        }
    }

    /// Receive one framed UTF-8 message
    ///
    /// Only valid when connected; failure marks the client disconnected and
    /// propagates, since the caller cannot proceed without the response.
    pub async fn receive_message(&mut self) -> Result<String, ClientError> {
        if self.state != ClientState::Connected {
            return Err(ClientError::NotConnected);
        }
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        let payload = match framing::read_frame(stream).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to receive message");
                self.mark_disconnected();
                return Err(e.into());
            }
        };

        match String::from_utf8(payload) {
            Ok(text) => {
                debug!(len = text.len(), "message received");
                Ok(text)
            }
            Err(e) => {
                self.mark_disconnected();
                Err(e.into())
            }
        }
    }

    /// Close the connection gracefully; idempotent
    ///
    /// The stream is fully shut down before this returns, and the state is
    /// [`ClientState::Closed`] unconditionally.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!(error = %e, "error during stream shutdown");
            }
        }
        self.state = ClientState::Closed;
        debug!("connection closed");
    }

    fn mark_disconnected(&mut self) {
        self.stream = None;
        self.state = ClientState::Disconnected;
    }
}
