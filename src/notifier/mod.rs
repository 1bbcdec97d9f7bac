//! Outbound notification delivery with bounded retries
//!
//! [`Notifier`] wraps a [`NotifyChannel`] with the retry policy: a fixed
//! number of attempts, each bounded by a timeout, with a fixed delay between
//! attempts. Delivery is best-effort — exhaustion is logged, never fatal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

mod telegram;

pub use telegram::TelegramChannel;

use crate::config::NotifyConfig;

/// Errors from a single delivery attempt
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The endpoint answered with a non-200 status
    #[error("notification endpoint returned status {0}")]
    Status(u16),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One-shot delivery to an external messaging channel
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Attempt to deliver `text` once
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Bounded-retry wrapper around a [`NotifyChannel`]
pub struct Notifier {
    channel: Arc<dyn NotifyChannel>,
    max_attempts: u32,
    attempt_timeout: Duration,
    retry_delay: Duration,
}

impl Notifier {
    /// Wrap `channel` with the retry policy from configuration
    pub fn new(channel: Arc<dyn NotifyChannel>, config: &NotifyConfig) -> Self {
        Self::with_policy(
            channel,
            config.max_attempts,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.retry_delay_secs),
        )
    }

    /// Wrap `channel` with an explicit retry policy
    pub fn with_policy(
        channel: Arc<dyn NotifyChannel>,
        max_attempts: u32,
        attempt_timeout: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            channel,
            max_attempts,
            attempt_timeout,
            retry_delay,
        }
    }

    /// Deliver `text`, retrying up to the configured attempt count
    ///
    /// Returns true on the first successful attempt, false once all attempts
    /// are exhausted. No delay follows the final attempt.
    pub async fn deliver(&self, text: &str) -> bool {
        for attempt in 1..=self.max_attempts {
            match tokio::time::timeout(self.attempt_timeout, self.channel.send(text)).await {
                Ok(Ok(())) => {
                    info!(attempt, "notification delivered");
                    return true;
                }
                Ok(Err(e)) => warn!(attempt, error = %e, "notification attempt failed"),
                Err(_) => warn!(attempt, timeout = ?self.attempt_timeout, "notification attempt timed out"),
            }

            if attempt < self.max_attempts {
                debug!(delay = ?self.retry_delay, "waiting before next attempt");
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        warn!(attempts = self.max_attempts, "all notification attempts failed");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Channel that fails a set number of times before succeeding
    struct FlakyChannel {
        failures_before_success: u32,
        attempts: AtomicU32,
        delivered: Mutex<Vec<String>>,
    }

    impl FlakyChannel {
        fn new(failures_before_success: u32) -> Arc<Self> {
            Arc::new(Self {
                failures_before_success,
                attempts: AtomicU32::new(0),
                delivered: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NotifyChannel for FlakyChannel {
        async fn send(&self, text: &str) -> Result<(), NotifyError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures_before_success {
                return Err(NotifyError::Status(503));
            }
            self.delivered.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn fast_notifier(channel: Arc<FlakyChannel>) -> Notifier {
        Notifier::with_policy(channel, 3, Duration::from_millis(100), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let channel = FlakyChannel::new(0);
        let notifier = fast_notifier(Arc::clone(&channel));

        assert!(notifier.deliver("Hello World").await);
        assert_eq!(channel.attempts(), 1);
        assert_eq!(*channel.delivered.lock().unwrap(), vec!["Hello World"]);
    }

    #[tokio::test]
    async fn test_succeeds_on_second_attempt() {
        let channel = FlakyChannel::new(1);
        let notifier = fast_notifier(Arc::clone(&channel));

        assert!(notifier.deliver("Hello World").await);
        assert_eq!(channel.attempts(), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_false_after_exactly_max_attempts() {
        let channel = FlakyChannel::new(u32::MAX);
        let notifier = fast_notifier(Arc::clone(&channel));

        assert!(!notifier.deliver("Hello World").await);
        assert_eq!(channel.attempts(), 3);
        assert!(channel.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_slow_channel_times_out_per_attempt() {
        struct StuckChannel {
            attempts: AtomicU32,
        }

        #[async_trait]
        impl NotifyChannel for StuckChannel {
            async fn send(&self, _text: &str) -> Result<(), NotifyError> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        }

        let channel = Arc::new(StuckChannel {
            attempts: AtomicU32::new(0),
        });
        let notifier =
            Notifier::with_policy(Arc::clone(&channel) as _, 2, Duration::from_millis(20), Duration::from_millis(5));

        assert!(!notifier.deliver("stuck").await);
        assert_eq!(channel.attempts.load(Ordering::SeqCst), 2);
    }
}
