//! Announcement frame handler
//!
//! Frames arrive as a `{type, topic, data}` envelope whose `data` field is a
//! JSON string holding the announcement itself. Anything that fails to parse
//! is forwarded verbatim as plain text so no frame is ever dropped.

use super::FrameHandler;
use crate::alert::{format, Notifier};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    topic: String,
    /// JSON-encoded announcement payload
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Announcement {
    #[serde(default)]
    catalog_name: String,
    /// Publish time in unix milliseconds
    #[serde(default)]
    publish_date: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
}

/// Pushes parsed announcements (or raw frames) through a webhook bot.
pub struct AnnouncementHandler {
    notifier: Arc<dyn Notifier>,
}

impl AnnouncementHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

fn parse(raw: &str) -> Option<(String, Announcement)> {
    let envelope: Envelope = serde_json::from_str(raw).ok()?;
    if envelope.kind != "DATA" {
        return None;
    }
    let announcement: Announcement = serde_json::from_str(&envelope.data).ok()?;
    Some((envelope.topic, announcement))
}

fn render(topic: &str, announcement: &Announcement) -> String {
    let published = Utc
        .timestamp_millis_opt(announcement.publish_date)
        .single()
        .map(format::display_time)
        .unwrap_or_default();
    format!(
        "**Topic**: {}\n\n**Catalog**: {}\n\n**Time**: {}\n\n{}",
        topic, announcement.catalog_name, published, announcement.body
    )
}

#[async_trait]
impl FrameHandler for AnnouncementHandler {
    async fn handle(&self, raw: &str) {
        tracing::debug!(len = raw.len(), "announcement frame received");

        if let Some((topic, announcement)) = parse(raw) {
            let text = render(&topic, &announcement);
            if let Err(e) = self
                .notifier
                .send_markdown(&announcement.title, &text, &[], false)
                .await
            {
                tracing::warn!(error = %e, "announcement alert failed");
            }
            return;
        }

        if let Err(e) = self.notifier.send_text(raw, &[], false).await {
            tracing::warn!(error = %e, "raw frame alert failed");
        }
    }
}
