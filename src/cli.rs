//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Gossipd - fixed-peer TCP rendezvous with Telegram notification
#[derive(Parser)]
#[command(
    name = "gossipd",
    about = "Fixed-peer TCP rendezvous coordinator with Telegram notification",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Role to run as
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run as the coordinator: wait for all peers, forward the combined message
    Serve,

    /// Run as a peer: send one message and wait for the acknowledgment
    Send {
        /// Message to send (a random vocabulary word when omitted)
        message: Option<String>,
    },
}
