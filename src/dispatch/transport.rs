//! Notification transport seam and its adapters.
//!
//! The dispatcher only knows [`NotificationTransport::send`]. Message
//! formatting happens before the call; rate limiting happens around it.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::RecipientId;
use crate::error::SentinelError;

/// Delivers one text message to one recipient.
pub trait NotificationTransport: Send + Sync + 'static {
    /// Sends `text` to `recipient`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::DeliveryFailure`] when the message could not
    /// be delivered.
    fn send(
        &self,
        recipient: RecipientId,
        text: &str,
    ) -> impl Future<Output = Result<(), SentinelError>> + Send;
}

/// Transport that only logs messages. Used when no bot token is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl NotificationTransport for LogTransport {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), SentinelError> {
        tracing::info!(%recipient, chars = text.chars().count(), text, "notification (dry run)");
        Ok(())
    }
}

/// Telegram Bot API transport (`sendMessage`).
#[derive(Clone)]
pub struct TelegramTransport {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramTransport {
    /// Creates a transport for the bot identified by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SentinelError::Config`] if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SentinelError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SentinelError::Config(format!("telegram client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

impl fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl NotificationTransport for TelegramTransport {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), SentinelError> {
        let failure = |reason: String| SentinelError::DeliveryFailure { recipient, reason };

        let response = self
            .client
            .post(self.endpoint())
            .json(&SendMessageRequest {
                chat_id: recipient.get(),
                text,
                disable_web_page_preview: true,
            })
            .send()
            .await
            // Strip the URL: it embeds the bot token.
            .map_err(|e| failure(e.without_url().to_string()))?;

        let status = response.status();
        let body: TelegramResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("HTTP {status}: {}", e.without_url())))?;

        if body.ok {
            Ok(())
        } else {
            Err(failure(format!(
                "HTTP {status}: {}",
                body.description.unwrap_or_else(|| "no description".to_string())
            )))
        }
    }
}

/// Transport selected at startup from configuration.
#[derive(Debug, Clone)]
pub enum AnyTransport {
    /// Real delivery through the Telegram Bot API.
    Telegram(TelegramTransport),
    /// Log-only delivery.
    Log(LogTransport),
}

impl NotificationTransport for AnyTransport {
    async fn send(&self, recipient: RecipientId, text: &str) -> Result<(), SentinelError> {
        match self {
            Self::Telegram(t) => t.send(recipient, text).await,
            Self::Log(t) => t.send(recipient, text).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_transport_always_succeeds() {
        assert!(LogTransport.send(RecipientId::new(1), "hello").await.is_ok());
    }

    #[test]
    fn telegram_debug_redacts_token() {
        let Ok(t) = TelegramTransport::new(
            "https://api.telegram.org/",
            "123:SECRET",
            Duration::from_secs(5),
        ) else {
            panic!("client build failed");
        };
        let debug = format!("{t:?}");
        assert!(!debug.contains("SECRET"));
        assert_eq!(
            t.endpoint(),
            "https://api.telegram.org/bot123:SECRET/sendMessage"
        );
    }

    #[test]
    fn send_message_request_shape() {
        let body = SendMessageRequest {
            chat_id: -100,
            text: "hi",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&body).ok();
        assert_eq!(
            json,
            Some(serde_json::json!({
                "chat_id": -100,
                "text": "hi",
                "disable_web_page_preview": true
            }))
        );
    }

    #[test]
    fn telegram_error_body_parses() {
        let parsed: Option<TelegramResponse> = serde_json::from_str(
            r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        )
        .ok();
        let Some(parsed) = parsed else {
            panic!("parse failed");
        };
        assert!(!parsed.ok);
        assert_eq!(
            parsed.description.as_deref(),
            Some("Forbidden: bot was blocked by the user")
        );
    }
}
