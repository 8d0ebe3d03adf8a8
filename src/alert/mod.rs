//! Outbound alerting
//!
//! Every monitor pushes through the same webhook bot abstraction. Delivery is
//! at-least-once: send failures are logged by the caller and never retried by
//! the scheduler itself.

pub mod format;
mod webhook;

pub use webhook::{WebhookBot, WebhookConfig};

use async_trait::async_trait;
use thiserror::Error;

/// Alert delivery errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("webhook rejected message: {message} (code: {code})")]
    Rejected { code: i64, message: String },
    #[error("invalid webhook url: {0}")]
    InvalidUrl(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Outbound notification capability consumed by every monitor
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel tag prepended to titles (the bot's keyword)
    fn tag(&self) -> &str;

    /// Push a markdown alert
    async fn send_markdown(
        &self,
        title: &str,
        text: &str,
        mentions: &[String],
        mention_all: bool,
    ) -> Result<(), AlertError>;

    /// Push a plain-text alert
    async fn send_text(
        &self,
        content: &str,
        mentions: &[String],
        mention_all: bool,
    ) -> Result<(), AlertError>;
}
