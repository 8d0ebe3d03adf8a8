//! Tweet search client
//!
//! Advanced-search endpoint of a twitterapi.io-style service. Raw responses
//! are mapped down to the handful of fields the post monitor needs. Tweet ids
//! are snowflakes: fixed-width, time-ordered, safe to compare as strings.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

/// Advanced search base URL
pub const TWITTER_BASE_URL: &str = "https://api.twitterapi.io/twitter/tweet/advanced_search";

/// Milliseconds between the unix epoch and the snowflake epoch
const SNOWFLAKE_EPOCH_MS: i64 = 1_288_834_974_657;

/// Search request parameters
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub cursor: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            cursor: None,
        }
    }
}

/// Simplified post returned to monitors
#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub url: String,
    pub text: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub is_reply: bool,
    pub in_reply_to: String,
    pub author_handle: String,
    pub author_name: String,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    tweets: Vec<RawTweet>,
}

#[derive(Debug, Deserialize)]
struct RawTweet {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    text: String,
    #[serde(default, rename = "createdAt")]
    created_at: String,
    #[serde(default, rename = "isReply")]
    is_reply: bool,
    #[serde(default, rename = "inReplyToUserId")]
    in_reply_to_user_id: String,
    #[serde(default, rename = "inReplyToUsername")]
    in_reply_to_username: String,
    #[serde(default)]
    author: RawAuthor,
    #[serde(default)]
    entities: RawEntities,
}

#[derive(Debug, Default, Deserialize)]
struct RawAuthor {
    #[serde(default, rename = "userName")]
    user_name: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawEntities {
    #[serde(default)]
    user_mentions: Vec<RawUserMention>,
}

#[derive(Debug, Deserialize)]
struct RawUserMention {
    #[serde(default)]
    id_str: String,
    #[serde(default)]
    name: String,
}

impl RawTweet {
    fn simplify(self) -> Post {
        // Created-at comes in the classic Twitter format or RFC 3339
        let created_at = DateTime::parse_from_str(&self.created_at, "%a %b %d %H:%M:%S %z %Y")
            .or_else(|_| DateTime::parse_from_rfc3339(&self.created_at))
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        // Resolve the replied-to display name from mentions where possible
        let mut in_reply_to = String::new();
        if self.is_reply && !self.in_reply_to_user_id.is_empty() {
            in_reply_to = self
                .entities
                .user_mentions
                .iter()
                .find(|m| m.id_str == self.in_reply_to_user_id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| self.in_reply_to_username.clone());
        }

        Post {
            id: self.id,
            url: self.url,
            text: self.text,
            kind: self.kind,
            created_at,
            is_reply: self.is_reply,
            in_reply_to,
            author_handle: self.author.user_name,
            author_name: self.author.name,
        }
    }
}

/// Approximate creation time of a snowflake id, for log readability.
pub fn snowflake_to_time(id: &str) -> Option<DateTime<Utc>> {
    let id: i64 = id.parse().ok()?;
    let ms = (id >> 22) + SNOWFLAKE_EPOCH_MS;
    Utc.timestamp_millis_opt(ms).single()
}

/// Tweet search REST client
pub struct TwitterClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl TwitterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, TWITTER_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Run an advanced search and return simplified posts.
    pub async fn search(&self, request: &SearchRequest) -> anyhow::Result<Vec<Post>> {
        let mut query = vec![("query", request.query.clone())];
        if let Some(cursor) = &request.cursor {
            query.push(("cursor", cursor.clone()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("search API error: {} - {}", status, body);
        }

        let raw: RawSearchResponse = response.json().await?;
        Ok(raw.tweets.into_iter().map(RawTweet::simplify).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tweet_simplifies() {
        let json = r#"{
            "type": "tweet",
            "id": "1876543210987654321",
            "url": "https://x.com/alice/status/1876543210987654321",
            "text": "shipping soon",
            "createdAt": "Wed Jan 08 07:11:05 +0000 2025",
            "isReply": true,
            "inReplyToUserId": "42",
            "inReplyToUsername": "bob_fallback",
            "author": {"userName": "alice", "name": "Alice"},
            "entities": {"user_mentions": [{"id_str": "42", "name": "Bob"}]}
        }"#;
        let raw: RawTweet = serde_json::from_str(json).unwrap();
        let post = raw.simplify();

        assert_eq!(post.author_handle, "alice");
        assert_eq!(post.in_reply_to, "Bob");
        assert!(post.is_reply);
        assert_eq!(post.created_at.timestamp(), 1736320265);
    }

    #[test]
    fn reply_falls_back_to_username_field() {
        let json = r#"{
            "id": "1",
            "isReply": true,
            "inReplyToUserId": "99",
            "inReplyToUsername": "carol",
            "author": {"userName": "alice", "name": "Alice"},
            "entities": {"user_mentions": []}
        }"#;
        let raw: RawTweet = serde_json::from_str(json).unwrap();
        assert_eq!(raw.simplify().in_reply_to, "carol");
    }

    #[test]
    fn snowflake_time_roundtrip() {
        // 1876543210987654321 >> 22 ≈ late 2024/2025 era
        let t = snowflake_to_time("1876543210987654321").unwrap();
        assert!(t.timestamp() > 1_700_000_000);
        assert!(snowflake_to_time("not-a-number").is_none());
    }

    #[test]
    fn rfc3339_created_at_also_parses() {
        let json = r#"{
            "id": "2",
            "createdAt": "2025-01-08T07:11:05Z",
            "author": {"userName": "alice", "name": "Alice"}
        }"#;
        let raw: RawTweet = serde_json::from_str(json).unwrap();
        assert_eq!(raw.simplify().created_at.timestamp(), 1736320265);
    }
}
