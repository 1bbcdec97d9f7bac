//! Gossipd - fixed-peer TCP rendezvous with Telegram notification
//!
//! CLI entry point: runs as the coordinator (`serve`) or as a peer (`send`).

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use gossipd::cli::{Cli, Command};
use gossipd::client::{ReconnectingClient, random_payload};
use gossipd::config::Config;
use gossipd::coordinator::Coordinator;
use gossipd::notifier::{Notifier, TelegramChannel};

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    // Level priority: CLI --log-level > RUST_LOG > default (INFO)
    let level = match cli_log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Command::Serve => cmd_serve(&config).await,
        Command::Send { message } => cmd_send(&config, message).await,
    }
}

/// Run the coordinator until its single round completes
async fn cmd_serve(config: &Config) -> Result<()> {
    let notifier = match (&config.notify.bot_token, &config.notify.chat_id) {
        (Some(token), Some(chat_id)) => {
            let channel = TelegramChannel::new(
                token.clone(),
                chat_id.clone(),
                Duration::from_secs(config.notify.timeout_secs),
            )?;
            Some(Notifier::new(Arc::new(channel), &config.notify))
        }
        _ => {
            warn!("Telegram credentials not configured; the combined message will not be forwarded");
            None
        }
    };

    let coordinator = Coordinator::new(config.expected_peers, notifier);

    // Bind all interfaces; peers dial config.host
    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .context(format!("Failed to bind coordinator listener on port {}", config.port))?;
    info!(port = config.port, "waiting for {} peers", config.expected_peers);

    coordinator.run(listener).await
}

/// Run one full peer cycle: connect, send, receive, close
async fn cmd_send(config: &Config, message: Option<String>) -> Result<()> {
    let payload = message.unwrap_or_else(random_payload);
    info!(payload = %payload, host = %config.host, port = config.port, "sending message");

    let mut client = ReconnectingClient::from_config(config);
    client.connect().await;

    let outcome = match client.send_message(&payload).await {
        Ok(()) => client.receive_message().await.map_err(eyre::Report::from),
        Err(e) => {
            warn!(error = %e, "message could not be sent");
            Err(eyre::Report::from(e))
        }
    };

    client.close().await;

    let response = outcome?;
    info!(response = %response, "coordinator acknowledged");
    println!("{response}");
    Ok(())
}
