//! Notification delivery for alerts

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::TelegramConfig;
use crate::error::NotificationError;
use crate::models::NotificationRecord;

/// Result of sending a notification
#[derive(Debug, Clone)]
pub struct NotificationResult {
    /// Channel the message went to
    pub channel_type: String,
    /// Whether the channel accepted the message
    pub success: bool,
    /// Why delivery failed
    pub error: Option<String>,
    /// When the attempt started
    pub sent_at: DateTime<Utc>,
}

impl From<NotificationResult> for NotificationRecord {
    fn from(result: NotificationResult) -> Self {
        NotificationRecord {
            channel_type: result.channel_type,
            sent_at: result.sent_at,
            success: result.success,
            error: result.error,
        }
    }
}

/// A channel that can deliver a text message
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs and records
    fn channel(&self) -> &str;

    /// Deliver a message
    async fn notify(&self, message: &str) -> Result<(), NotificationError>;

    /// Deliver a message and record the outcome instead of failing
    async fn send(&self, message: &str) -> NotificationResult {
        let sent_at = Utc::now();
        let result = self.notify(message).await;

        if let Err(e) = &result {
            error!(channel = self.channel(), error = %e, "Failed to send notification");
        }

        NotificationResult {
            channel_type: self.channel().to_string(),
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
            sent_at,
        }
    }
}

/// Pick the notifier the configuration asks for
///
/// Falls back to [`LogNotifier`] when Telegram credentials are missing.
pub fn notifier_from_config(
    config: &TelegramConfig,
    timeout: Duration,
) -> Result<Box<dyn Notifier>, NotificationError> {
    if config.credentials().is_none() {
        warn!("Telegram bot token or chat id not configured, alerts will only be logged");
        return Ok(Box::new(LogNotifier));
    }

    Ok(Box::new(TelegramNotifier::new(config, timeout)?))
}

/// Sends messages through the Telegram Bot API
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier
    pub fn new(config: &TelegramConfig, timeout: Duration) -> Result<Self, NotificationError> {
        let (bot_token, chat_id) = config.credentials().ok_or_else(|| {
            NotificationError::ConfigError("telegram bot_token and chat_id are required".into())
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn channel(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, message: &str) -> Result<(), NotificationError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: message,
        };

        // reqwest errors carry the URL, which embeds the bot token
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::HttpError(e.without_url().to_string()))?;

        let status = response.status();
        let body: Option<TelegramResponse> = response.json().await.ok();

        match body {
            Some(TelegramResponse { ok: true, .. }) if status.is_success() => {
                info!(chat_id = %self.chat_id, "Telegram notification sent");
                Ok(())
            }
            Some(TelegramResponse { description, .. }) => Err(NotificationError::Rejected {
                channel: "telegram".to_string(),
                reason: description.unwrap_or_else(|| format!("HTTP {status}")),
            }),
            None => Err(NotificationError::HttpError(format!(
                "Telegram returned {status} with an unreadable body"
            ))),
        }
    }
}

/// Writes alerts to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &str {
        "log"
    }

    async fn notify(&self, message: &str) -> Result<(), NotificationError> {
        warn!(%message, "Alert");
        Ok(())
    }
}

// Telegram payload types
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}
