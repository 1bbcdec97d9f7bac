//! Telegram Bot API notification channel
//!
//! Delivers text through `sendMessage` on the Bot API. Success is HTTP 200;
//! the response body is never inspected.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{NotifyChannel, NotifyError};

const API_BASE: &str = "https://api.telegram.org";

/// Notification channel backed by a Telegram bot
///
/// Credentials are explicit constructor state, never read from the
/// environment here.
pub struct TelegramChannel {
    http: Client,
    token: String,
    chat_id: String,
    api_base: String,
}

impl TelegramChannel {
    /// Create a channel for the given bot and chat
    ///
    /// `timeout` bounds each HTTP request at the transport level, in addition
    /// to the notifier's per-attempt timeout.
    pub fn new(token: String, chat_id: String, timeout: Duration) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            token,
            chat_id,
            api_base: API_BASE.to_string(),
        })
    }

    /// Point the channel at a different API host (for testing)
    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);

        // Query parameters take care of URL-encoding the text
        let response = self
            .http
            .post(&url)
            .query(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), chat_id = %self.chat_id, "Telegram sendMessage completed");

        if status == StatusCode::OK {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal one-shot HTTP server answering every request with `status`
    async fn one_shot_http_server(status: u16) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 4096];
            let n = stream.read(&mut request).await.unwrap();
            let request = String::from_utf8_lossy(&request[..n]).to_string();

            let body = "{\"ok\":true}";
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            request
        });

        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_status_200_is_success() {
        let (base, server) = one_shot_http_server(200).await;
        let channel = TelegramChannel::new("t0ken".to_string(), "12345".to_string(), Duration::from_secs(1))
            .unwrap()
            .with_api_base(base);

        channel.send("Hello World").await.unwrap();

        let request = server.await.unwrap();
        // Bot token and chat id are on the request line; spaces are URL-encoded
        assert!(request.starts_with("POST /bott0ken/sendMessage?"));
        assert!(request.contains("chat_id=12345"));
        assert!(request.contains("text=Hello%20World") || request.contains("text=Hello+World"));
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let (base, server) = one_shot_http_server(500).await;
        let channel = TelegramChannel::new("t0ken".to_string(), "12345".to_string(), Duration::from_secs(1))
            .unwrap()
            .with_api_base(base);

        let err = channel.send("Hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(500)));
        server.await.unwrap();
    }
}
