//! Barrier coordinator
//!
//! Accepts one connection per peer, reads one framed message from each, and
//! once every expected peer has checked in, forwards the combined payload
//! through the notifier exactly once and shuts down. Each connection runs in
//! its own task; the round state lives behind one mutex so the
//! insert/check/claim sequence is atomic with respect to concurrently
//! completing peers.

use std::net::SocketAddr;
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

mod round;

pub use round::AggregationRound;

use crate::framing;
use crate::notifier::Notifier;

/// Fixed acknowledgment sent to every peer whose message was read
pub const ACK_MESSAGE: &str = "Message received";

/// Final notification emitted when the coordinator retires
const SHUTDOWN_NOTICE: &str = "Coordinator shutting down";

/// Coordinator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting for peers to check in
    Collecting,
    /// Barrier reached; the claiming task is blocking on the notifier
    Delivering,
    /// Round complete; new connections are rejected unread
    ShuttingDown,
    /// Accept loop exited and the listener is closed
    Stopped,
}

/// Round state guarded by a single lock (see module docs)
struct RoundState {
    round: AggregationRound,
    phase: Phase,
}

/// One-round rendezvous coordinator
///
/// Serves exactly one round, then retires. Without a notifier the external
/// call is skipped and the round still counts as delivered.
pub struct Coordinator {
    expected_peers: usize,
    notifier: Option<Notifier>,
    state: Mutex<RoundState>,
    shutdown: Notify,
}

impl Coordinator {
    /// Create a coordinator waiting for `expected_peers` distinct peers
    pub fn new(expected_peers: usize, notifier: Option<Notifier>) -> Arc<Self> {
        Arc::new(Self {
            expected_peers,
            notifier,
            state: Mutex::new(RoundState {
                round: AggregationRound::default(),
                phase: Phase::Collecting,
            }),
            shutdown: Notify::new(),
        })
    }

    /// Serve connections on `listener` until the round completes
    ///
    /// Returns once the accept loop has stopped, every in-flight connection
    /// task has finished, and the listener is closed. The listener is owned
    /// and closed here exactly once.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr().context("Failed to read listener address")?;
        info!(%addr, expected_peers = self.expected_peers, "coordinator listening");

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "accepted connection");
                            let coordinator = Arc::clone(&self);
                            connections.spawn(async move { coordinator.handle_connection(stream, peer).await });
                        }
                        Err(e) => warn!(error = %e, "failed to accept connection"),
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("stopping accept loop");
                    break;
                }
            }
        }

        // Closes the listening socket before we wait out in-flight peers
        drop(listener);

        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "connection task failed");
            }
        }

        let mut state = self.state.lock().await;
        state.phase = Phase::Stopped;
        info!("coordinator stopped");
        Ok(())
    }

    /// Handle one peer connection: read one frame, record it, evaluate the
    /// barrier, acknowledge, close.
    async fn handle_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        if self.is_retiring().await {
            debug!(%peer, "rejecting connection during shutdown");
            return;
        }

        let payload = match framing::read_frame(&mut stream).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%peer, error = %e, "failed to read peer message");
                return;
            }
        };
        let message = match String::from_utf8(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(%peer, error = %e, "discarding non-UTF-8 message");
                return;
            }
        };
        info!(%peer, message = %message, "received peer message");

        // Insert, barrier check, and delivery claim form one critical
        // section; at most one task ever gets a payload back.
        let claimed = {
            let mut state = self.state.lock().await;
            if matches!(state.phase, Phase::ShuttingDown | Phase::Stopped) {
                debug!(%peer, "round already closed, dropping message");
                return;
            }

            state.round.record(&peer.to_string(), message);
            debug!(peers = state.round.peer_count(), expected = self.expected_peers, "recorded peer message");

            match state.round.try_claim(self.expected_peers) {
                Some(payload) => {
                    state.phase = Phase::Delivering;
                    Some(payload)
                }
                None => None,
            }
        };

        if let Some(payload) = claimed {
            info!(payload = %payload, "barrier reached, delivering combined message");
            if self.deliver(&payload).await {
                self.initiate_shutdown().await;
            } else {
                warn!("combined message could not be delivered, round abandoned");
                let mut state = self.state.lock().await;
                if state.phase == Phase::Delivering {
                    state.phase = Phase::Collecting;
                }
            }
        }

        // Acknowledge regardless of barrier or delivery outcome
        match framing::write_frame(&mut stream, ACK_MESSAGE.as_bytes()).await {
            Ok(()) => debug!(%peer, "acknowledgment sent"),
            Err(e) => warn!(%peer, error = %e, "failed to send acknowledgment"),
        }
    }

    /// Forward the combined payload, or skip when no notifier is configured
    async fn deliver(&self, payload: &str) -> bool {
        match &self.notifier {
            Some(notifier) => notifier.deliver(payload).await,
            None => {
                info!("notification credentials not configured, skipping external delivery");
                true
            }
        }
    }

    /// Begin shutdown: stop accepting connections and emit the final notice
    ///
    /// Idempotent; only the first call transitions the phase and wakes the
    /// accept loop.
    pub async fn initiate_shutdown(&self) {
        {
            let mut state = self.state.lock().await;
            if matches!(state.phase, Phase::ShuttingDown | Phase::Stopped) {
                debug!("shutdown already initiated");
                return;
            }
            state.phase = Phase::ShuttingDown;
        }
        info!("round complete, shutting down");

        if let Some(notifier) = &self.notifier {
            // Best-effort farewell through the same delivery path
            notifier.deliver(SHUTDOWN_NOTICE).await;
        }

        self.shutdown.notify_one();
    }

    async fn is_retiring(&self) -> bool {
        let state = self.state.lock().await;
        matches!(state.phase, Phase::ShuttingDown | Phase::Stopped)
    }

    #[cfg(test)]
    async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    #[cfg(test)]
    async fn recorded_peers(&self) -> usize {
        self.state.lock().await.round.peer_count()
    }
}
