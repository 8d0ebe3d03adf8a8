//! HMAC-signed webhook bot
//!
//! Pushes text/markdown messages to a DingTalk-style robot endpoint. When a
//! secret is configured, each request is signed with
//! base64(HMAC-SHA256(secret, "{timestamp_ms}\n{secret}")) carried as query
//! parameters alongside the access token.

use super::{AlertError, Notifier};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Default robot endpoint
pub const WEBHOOK_BASE_URL: &str = "https://oapi.dingtalk.com/robot/send";

/// Webhook bot configuration
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub base_url: String,
    pub access_token: String,
    /// Signing secret; empty disables signing
    pub secret: String,
    /// Channel keyword, prepended to outgoing messages
    pub keyword: String,
    pub timeout: Duration,
}

impl WebhookConfig {
    pub fn new(
        access_token: impl Into<String>,
        secret: impl Into<String>,
        keyword: impl Into<String>,
    ) -> Self {
        Self {
            base_url: WEBHOOK_BASE_URL.to_string(),
            access_token: access_token.into(),
            secret: secret.into(),
            keyword: keyword.into(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the endpoint (used by tests)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct Mention<'a> {
    #[serde(rename = "atMobiles")]
    at_mobiles: &'a [String],
    #[serde(rename = "isAtAll")]
    is_at_all: bool,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    msgtype: &'static str,
    text: TextBody<'a>,
    at: Mention<'a>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MarkdownMessage<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
    at: Mention<'a>,
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Webhook robot client
pub struct WebhookBot {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookBot {
    pub fn new(config: WebhookConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");
        Self { config, client }
    }

    /// Signature for a millisecond timestamp: the signed string is
    /// "{timestamp}\n{secret}".
    fn sign(&self, timestamp_ms: i64) -> Result<String, AlertError> {
        let payload = format!("{}\n{}", timestamp_ms, self.config.secret);
        let mut mac = HmacSha256::new_from_slice(self.config.secret.as_bytes())
            .map_err(|e| AlertError::Signing(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    fn signed_url(&self) -> Result<reqwest::Url, AlertError> {
        let mut url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|e| AlertError::InvalidUrl(e.to_string()))?;

        let mut sign = None;
        let timestamp = chrono::Utc::now().timestamp_millis();
        if !self.config.secret.is_empty() {
            sign = Some(self.sign(timestamp)?);
        }

        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("access_token", &self.config.access_token);
        if let Some(sign) = sign {
            pairs.append_pair("timestamp", &timestamp.to_string());
            pairs.append_pair("sign", &sign);
        }
        drop(pairs);

        Ok(url)
    }

    async fn send<T: Serialize>(&self, msg: &T) -> Result<(), AlertError> {
        let url = self.signed_url()?;
        let resp = self.client.post(url).json(msg).send().await?;
        let body: WebhookResponse = resp.json().await?;

        if body.errcode != 0 {
            return Err(AlertError::Rejected {
                code: body.errcode,
                message: body.errmsg,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookBot {
    fn tag(&self) -> &str {
        &self.config.keyword
    }

    async fn send_markdown(
        &self,
        title: &str,
        text: &str,
        mentions: &[String],
        mention_all: bool,
    ) -> Result<(), AlertError> {
        // The robot drops messages missing its keyword
        let tagged;
        let text = if !self.config.keyword.is_empty() && !text.contains(&self.config.keyword) {
            tagged = format!("[{}]\n{}", self.config.keyword, text);
            &tagged
        } else {
            text
        };

        let msg = MarkdownMessage {
            msgtype: "markdown",
            markdown: MarkdownBody { title, text },
            at: Mention {
                at_mobiles: mentions,
                is_at_all: mention_all,
            },
        };
        self.send(&msg).await
    }

    async fn send_text(
        &self,
        content: &str,
        mentions: &[String],
        mention_all: bool,
    ) -> Result<(), AlertError> {
        let tagged;
        let content = if !self.config.keyword.is_empty() {
            tagged = format!("[{}] {}", self.config.keyword, content);
            &tagged
        } else {
            content
        };

        let msg = TextMessage {
            msgtype: "text",
            text: TextBody { content },
            at: Mention {
                at_mobiles: mentions,
                is_at_all: mention_all,
            },
        };
        self.send(&msg).await
    }
}
