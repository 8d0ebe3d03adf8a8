//! Account post monitor
//!
//! Polls a search API for fresh posts from configured accounts and pushes
//! them as one markdown alert per account, newest first. Delivery is
//! deduplicated through a per-account watermark: the first poll looks back
//! two hours, every later poll asks only for posts above the last-seen id.
//! Keyword filtering applies to delivery only; the watermark always advances
//! past filtered posts so they are never reconsidered.

use crate::alert::{format, Notifier};
use crate::feeds::{snowflake_to_time, Post, SearchRequest, TwitterClient};
use crate::schedule::Job;
use crate::watch::watermark::WatermarkStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of recent posts for a search query.
#[async_trait]
pub trait PostSource: Send + Sync + 'static {
    async fn recent_posts(&self, query: &str) -> anyhow::Result<Vec<Post>>;
}

#[async_trait]
impl PostSource for TwitterClient {
    async fn recent_posts(&self, query: &str) -> anyhow::Result<Vec<Post>> {
        self.search(&SearchRequest::new(query)).await
    }
}

#[async_trait]
impl<T: PostSource> PostSource for Arc<T> {
    async fn recent_posts(&self, query: &str) -> anyhow::Result<Vec<Post>> {
        (**self).recent_posts(query).await
    }
}

/// Periodic job watching a set of accounts for new posts.
pub struct PostWatchJob<S: PostSource> {
    source: S,
    notifier: Arc<dyn Notifier>,
    watermarks: Arc<WatermarkStore>,
    usernames: Vec<String>,
    /// Delivery allow-list, case-insensitive; empty delivers everything
    keywords: Vec<String>,
}

impl<S: PostSource> PostWatchJob<S> {
    pub fn new(
        source: S,
        notifier: Arc<dyn Notifier>,
        watermarks: Arc<WatermarkStore>,
        usernames: Vec<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            source,
            notifier,
            watermarks,
            usernames,
            keywords,
        }
    }

    fn matches_keywords(&self, text: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .any(|k| text.contains(&k.to_lowercase()))
    }

    async fn check_account(&self, username: &str) -> anyhow::Result<()> {
        let watermark = self.watermarks.get(username).await;
        let query = if watermark.is_empty() {
            format!("from:{} within_time:2h", username)
        } else {
            let since = snowflake_to_time(&watermark)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            tracing::debug!(account = %username, watermark = %watermark, since = %since, "polling above watermark");
            format!("from:{} since_id:{}", username, watermark)
        };

        let posts = self.source.recent_posts(&query).await?;

        // The search index can surface retweets-of and mentions; keep only
        // posts authored by the watched account.
        let mut posts: Vec<Post> = posts
            .into_iter()
            .filter(|p| p.author_handle.eq_ignore_ascii_case(username))
            .collect();

        // Newest first. Ids are fixed-width snowflakes, string order is time
        // order.
        posts.sort_by(|a, b| b.id.cmp(&a.id));

        // The watermark candidate is taken before keyword filtering so that
        // filtered-out posts are not re-fetched forever.
        let candidate = posts.first().map(|p| p.id.clone()).unwrap_or_default();

        let fresh: Vec<Post> = posts
            .into_iter()
            .filter(|p| p.id.as_str() > watermark.as_str())
            .collect();

        // One alert per account per tick, newest post on top
        let matching: Vec<&Post> = fresh
            .iter()
            .filter(|p| self.matches_keywords(&p.text))
            .collect();

        let mut delivered = 0usize;
        if !matching.is_empty() {
            let title = format!("[{}] new post", username);
            let body = matching
                .iter()
                .map(|p| render_post(p))
                .collect::<Vec<_>>()
                .join("\n\n---\n\n");
            if let Err(e) = self.notifier.send_markdown(&title, &body, &[], false).await {
                tracing::warn!(account = %username, count = matching.len(), error = %e, "post alert failed");
            } else {
                delivered = matching.len();
            }
        }

        if !candidate.is_empty() {
            self.watermarks.advance(username, &candidate).await;
        }

        if delivered > 0 {
            tracing::info!(account = %username, delivered, watermark = %candidate, "new posts delivered");
        }
        Ok(())
    }
}

fn render_post(post: &Post) -> String {
    let mut lines = vec![format!("#### {} (@{})", post.author_name, post.author_handle)];
    if !post.kind.is_empty() {
        lines.push(format!("- Type: {}", post.kind));
    }
    if post.is_reply {
        lines.push(format!("- Reply to: {}", post.in_reply_to));
    }
    lines.push(String::new());
    lines.push(post.text.clone());
    lines.push(String::new());
    lines.push(format!("- [link]({})", post.url));
    lines.push(format!("- Time: {}", format::relative_time(post.created_at)));
    lines.join("\n")
}

#[async_trait]
impl<S: PostSource> Job for PostWatchJob<S> {
    fn name(&self) -> &str {
        "post_monitor"
    }

    async fn run(&mut self) -> anyhow::Result<()> {
        for username in &self.usernames {
            if let Err(e) = self.check_account(username).await {
                tracing::warn!(account = %username, error = %e, "post check failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watch::testutil::RecordingNotifier;
    use chrono::Utc;
    use std::sync::Mutex;

    fn post(id: &str, author: &str, text: &str) -> Post {
        Post {
            id: id.to_string(),
            url: format!("https://x.com/{}/status/{}", author, id),
            text: text.to_string(),
            kind: "tweet".to_string(),
            created_at: Utc::now(),
            is_reply: false,
            in_reply_to: String::new(),
            author_handle: author.to_string(),
            author_name: author.to_string(),
        }
    }

    struct StubSource {
        posts: Vec<Post>,
        queries: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl PostSource for StubSource {
        async fn recent_posts(&self, query: &str) -> anyhow::Result<Vec<Post>> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.posts.clone())
        }
    }

    fn job_with(
        posts: Vec<Post>,
        keywords: Vec<String>,
        fail_notify: bool,
    ) -> (
        PostWatchJob<StubSource>,
        Arc<Mutex<Vec<String>>>,
        Arc<RecordingNotifier>,
        Arc<WatermarkStore>,
    ) {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let notifier = Arc::new(if fail_notify {
            RecordingNotifier::failing()
        } else {
            RecordingNotifier::new()
        });
        let store = Arc::new(WatermarkStore::new());
        let job = PostWatchJob::new(
            StubSource {
                posts,
                queries: queries.clone(),
            },
            notifier.clone(),
            store.clone(),
            vec!["alice".to_string()],
            keywords,
        );
        (job, queries, notifier, store)
    }

    #[tokio::test]
    async fn first_run_batches_newest_first_and_sets_watermark() {
        let posts = vec![
            post("100", "alice", "first"),
            post("200", "alice", "third"),
            post("150", "alice", "second"),
        ];
        let (mut job, queries, notifier, store) = job_with(posts, vec![], false);

        job.run().await.unwrap();

        assert_eq!(queries.lock().unwrap()[0], "from:alice within_time:2h");
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        let body = &sent[0];
        let third = body.find("third").unwrap();
        let second = body.find("second").unwrap();
        let first = body.find("first").unwrap();
        assert!(third < second && second < first);
        assert_eq!(body.matches("\n\n---\n\n").count(), 2);
        assert_eq!(store.get("alice").await, "200");
    }

    #[tokio::test]
    async fn repeated_run_is_idempotent() {
        let posts = vec![post("100", "alice", "a"), post("200", "alice", "b")];
        let (mut job, queries, notifier, store) = job_with(posts, vec![], false);

        job.run().await.unwrap();
        job.run().await.unwrap();

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(store.get("alice").await, "200");
        assert_eq!(queries.lock().unwrap()[1], "from:alice since_id:200");
    }

    #[tokio::test]
    async fn since_watermark_fetch_delivers_all_newer() {
        let posts = vec![post("200", "alice", "beta"), post("180", "alice", "alpha")];
        let (mut job, queries, notifier, store) = job_with(posts, vec![], false);
        store.advance("alice", "150").await;

        job.run().await.unwrap();

        assert_eq!(queries.lock().unwrap()[0], "from:alice since_id:150");
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        let body = &sent[0];
        assert!(body.find("beta").unwrap() < body.find("alpha").unwrap());
        assert_eq!(store.get("alice").await, "200");
    }

    #[tokio::test]
    async fn keyword_filter_suppresses_delivery_but_advances_watermark() {
        let posts = vec![post("300", "alice", "nothing relevant")];
        let (mut job, _queries, notifier, store) = job_with(posts, vec!["launch".to_string()], false);

        job.run().await.unwrap();

        assert!(notifier.sent().is_empty());
        assert_eq!(store.get("alice").await, "300");
    }

    #[tokio::test]
    async fn keyword_match_is_case_insensitive() {
        let posts = vec![
            post("300", "alice", "LAUNCH day is here"),
            post("301", "alice", "unrelated"),
        ];
        let (mut job, _queries, notifier, _store) = job_with(posts, vec!["launch".to_string()], false);

        job.run().await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("LAUNCH day"));
        assert!(!sent[0].contains("unrelated"));
    }

    #[tokio::test]
    async fn other_authors_are_ignored_entirely() {
        let posts = vec![
            post("500", "mallory", "spoofed"),
            post("400", "Alice", "mixed case author"),
        ];
        let (mut job, _queries, notifier, store) = job_with(posts, vec![], false);

        job.run().await.unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("mixed case author"));
        assert!(!sent[0].contains("spoofed"));
        // Candidate comes from author-filtered posts only
        assert_eq!(store.get("alice").await, "400");
    }

    #[tokio::test]
    async fn failed_delivery_still_commits_watermark() {
        let posts = vec![post("600", "alice", "will fail to send")];
        let (mut job, _queries, notifier, store) = job_with(posts, vec![], true);

        job.run().await.unwrap();

        assert!(notifier.sent().is_empty());
        assert_eq!(store.get("alice").await, "600");
    }

    #[tokio::test]
    async fn stale_results_never_rewind_watermark() {
        let (mut job, _queries, _notifier, store) = {
            let posts = vec![post("100", "alice", "old")];
            job_with(posts, vec![], false)
        };
        store.advance("alice", "900").await;

        job.run().await.unwrap();

        assert_eq!(store.get("alice").await, "900");
    }

    #[tokio::test]
    async fn empty_result_leaves_watermark_untouched() {
        let (mut job, _queries, notifier, store) = job_with(vec![], vec![], false);
        store.advance("alice", "700").await;

        job.run().await.unwrap();

        assert!(notifier.sent().is_empty());
        assert_eq!(store.get("alice").await, "700");
    }
}
