//! Gossipd - fixed-peer TCP rendezvous with Telegram notification
//!
//! A fixed number of peers each send one framed message to a coordinator;
//! once every expected peer has checked in, the coordinator joins the
//! messages in arrival order and forwards the combined payload to a Telegram
//! chat exactly once, then retires. The same binary runs both roles.
//!
//! # Modules
//!
//! - [`framing`] - length-prefixed frame codec shared by both roles
//! - [`client`] - reconnecting peer client (connect, send, receive, close)
//! - [`coordinator`] - barrier and aggregation state machine
//! - [`notifier`] - bounded-retry delivery to the external channel
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod framing;
pub mod notifier;

// Re-export commonly used types
pub use client::{ClientError, ClientState, ReconnectingClient, random_payload};
pub use config::{Config, NotifyConfig};
pub use coordinator::{ACK_MESSAGE, AggregationRound, Coordinator};
pub use framing::{FrameError, MAX_FRAME_SIZE, read_frame, write_frame};
pub use notifier::{Notifier, NotifyChannel, NotifyError, TelegramChannel};
