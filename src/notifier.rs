//! # notifier — deliver report text to a chat channel
//!
//! [`TelegramNotifier`] posts to the Bot API `sendMessage` method with
//! `parse_mode=Markdown`.
//!
//! ## Retry policy
//! Exactly one retry, and only for a rate-limit answer (`error_code` 429)
//! carrying a positive `parameters.retry_after`: sleep that many seconds, then
//! post once more. Every other failure is logged and reported as
//! [`Delivery::Failed`]. Nothing is ever raised to the caller.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::TelegramSettings;
use crate::error::NotifyError;

const PREVIEW_CHARS: usize = 100;

// ─── Contract ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Delivered on the single retry after a rate-limit pause
    SentAfterRetry,
    /// No channel configured
    Skipped,
    Failed(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Delivery;
}

/// Stand-in used when no bot token / chat id is configured.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, text: &str) -> Delivery {
        debug!(preview = %preview(text), "Chat notifier not configured — message not sent");
        Delivery::Skipped
    }
}

// ─── Telegram Wire Types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok:          bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code:  Option<i64>,
    #[serde(default)]
    parameters:  Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<i64>,
}

/// Outcome of a single `sendMessage` call.
#[derive(Debug, PartialEq)]
enum Attempt {
    Delivered,
    RateLimited { retry_after: u64 },
    Rejected(String),
}

fn classify(resp: TelegramResponse) -> Attempt {
    if resp.ok {
        return Attempt::Delivered;
    }

    let description = resp.description.unwrap_or_else(|| "unknown error".to_string());
    let code = resp.error_code.unwrap_or_default();

    if code == 429 {
        match resp.parameters.and_then(|p| p.retry_after) {
            Some(secs) if secs > 0 => return Attempt::RateLimited { retry_after: secs as u64 },
            _ => warn!("Telegram rate limit hit, but no valid retry_after — not retrying"),
        }
    }

    Attempt::Rejected(format!("{description} (error code {code})"))
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

// ─── Telegram ─────────────────────────────────────────────────────────────────

pub struct TelegramNotifier {
    client:   reqwest::Client,
    settings: TelegramSettings,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, settings: TelegramSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.settings.api_url.trim_end_matches('/'),
            self.settings.bot_token.expose_secret()
        )
    }

    async fn post_once(&self, text: &str) -> Result<Attempt, NotifyError> {
        let resp = self
            .client
            .post(self.endpoint())
            .form(&[
                ("chat_id", self.settings.chat_id.as_str()),
                ("text", text),
                ("parse_mode", "Markdown"),
            ])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        debug!(http_status = %status, response = %body, "Telegram API response");

        // Telegram answers errors with a JSON body too, so parse regardless of status
        match serde_json::from_str::<TelegramResponse>(&body) {
            Ok(parsed) => Ok(classify(parsed)),
            Err(_) if !status.is_success() => Ok(Attempt::Rejected(format!("HTTP {status}: {body}"))),
            Err(e) => Err(NotifyError::Malformed(e.to_string())),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Delivery {
        let first = match self.post_once(text).await {
            Ok(attempt) => attempt,
            Err(e) => {
                error!(error = %e, "Failed to send Telegram message");
                return Delivery::Failed(e.to_string());
            }
        };

        let retry_after = match first {
            Attempt::Delivered => {
                info!(preview = %preview(text), "Message sent to Telegram successfully");
                return Delivery::Sent;
            }
            Attempt::Rejected(reason) => {
                error!(reason = %reason, preview = %preview(text), "Telegram API error");
                return Delivery::Failed(reason);
            }
            Attempt::RateLimited { retry_after } => retry_after,
        };

        warn!(retry_after, "Telegram rate limit hit — retrying once after delay");
        tokio::time::sleep(Duration::from_secs(retry_after)).await;

        match self.post_once(text).await {
            Ok(Attempt::Delivered) => {
                info!(preview = %preview(text), "Message sent to Telegram successfully after retry");
                Delivery::SentAfterRetry
            }
            Ok(Attempt::RateLimited { .. }) => {
                error!("Telegram still rate limited on retry — giving up");
                Delivery::Failed("rate limited".to_string())
            }
            Ok(Attempt::Rejected(reason)) => {
                error!(reason = %reason, "Telegram API error on retry");
                Delivery::Failed(reason)
            }
            Err(e) => {
                error!(error = %e, "Failed to send Telegram message on retry");
                Delivery::Failed(e.to_string())
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
