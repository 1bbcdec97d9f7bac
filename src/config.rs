//! Gossipd configuration types and loading
//!
//! One immutable [`Config`] is constructed at startup and passed explicitly
//! into the coordinator or client; nothing reads process-wide state after
//! that point.

use eyre::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Main gossipd configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordinator address peers dial; the coordinator itself binds all interfaces
    pub host: String,

    /// Coordinator TCP port
    pub port: u16,

    /// Number of distinct peers that must check in before the combined
    /// message is forwarded
    #[serde(rename = "expected-peers")]
    pub expected_peers: usize,

    /// Per-attempt connect timeout for peers, in seconds
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Delay between failed connect attempts, in seconds
    #[serde(rename = "reconnect-delay-secs")]
    pub reconnect_delay_secs: u64,

    /// Outbound notification settings
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            expected_peers: 2,
            connect_timeout_secs: 3,
            reconnect_delay_secs: 5,
            notify: NotifyConfig::default(),
        }
    }
}

/// Telegram notification settings
///
/// Credentials are optional: without them the coordinator skips the external
/// call and the round still counts as delivered.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Telegram bot token
    #[serde(rename = "bot-token")]
    pub bot_token: Option<String>,

    /// Telegram chat to deliver the combined message to
    #[serde(rename = "chat-id")]
    pub chat_id: Option<String>,

    /// Maximum delivery attempts per payload
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Per-attempt timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Delay between failed attempts in seconds
    #[serde(rename = "retry-delay-secs")]
    pub retry_delay_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            max_attempts: 3,
            timeout_secs: 3,
            retry_delay_secs: 5,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_chain(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, it must load
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .gossipd.yml
        let local_config = PathBuf::from(".gossipd.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/gossipd/gossipd.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("gossipd").join("gossipd.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Environment variables override file values; the credential names match
    /// the deployment environment this replaces.
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("COORDINATOR_IP") {
            self.host = host;
        }
        if let Ok(port) = std::env::var("COORDINATOR_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!(%port, "Ignoring non-numeric COORDINATOR_PORT"),
            }
        }
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            self.notify.bot_token = Some(token);
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            self.notify.chat_id = Some(chat_id);
        }
    }

    /// Validate configuration before any network activity
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(eyre::eyre!("Coordinator port must be non-zero"));
        }
        if self.expected_peers == 0 {
            return Err(eyre::eyre!("expected-peers must be at least 1"));
        }
        if self.notify.max_attempts == 0 {
            return Err(eyre::eyre!("notify.max-attempts must be at least 1"));
        }
        if self.notify.bot_token.is_some() != self.notify.chat_id.is_some() {
            return Err(eyre::eyre!(
                "Telegram credentials are incomplete: set both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID, or neither"
            ));
        }
        Ok(())
    }
}
