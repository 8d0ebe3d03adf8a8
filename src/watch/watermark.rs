//! Per-subject watermark store
//!
//! Tracks the last-seen identifier for each monitored subject so overlapping
//! polls never re-deliver already-seen items. Identifiers are fixed-width,
//! time-ordered tokens, so lexicographic comparison is ordering-correct.
//! State is in-memory only and lost on restart by design.

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Concurrent map of subject to last-seen identifier.
///
/// Each subject is only written from its own task's serialized tick stream;
/// the reader/writer lock keeps the map safe for external inspection and any
/// future multi-writer use.
#[derive(Debug, Default)]
pub struct WatermarkStore {
    inner: RwLock<HashMap<String, String>>,
}

impl WatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-seen identifier for `subject`; empty string before the first run.
    pub async fn get(&self, subject: &str) -> String {
        self.inner
            .read()
            .await
            .get(subject)
            .cloned()
            .unwrap_or_default()
    }

    /// Advance the watermark for `subject`. Forward-only: a candidate at or
    /// below the stored value is ignored, so the watermark never decreases.
    pub async fn advance(&self, subject: &str, candidate: &str) {
        if candidate.is_empty() {
            return;
        }
        let mut map = self.inner.write().await;
        match map.get(subject) {
            Some(current) if candidate.as_bytes() <= current.as_bytes() => {}
            _ => {
                map.insert(subject.to_string(), candidate.to_string());
            }
        }
    }

    /// Snapshot of every tracked subject, for diagnostics.
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_before_first_advance() {
        let store = WatermarkStore::new();
        assert_eq!(store.get("alice").await, "");
    }

    #[tokio::test]
    async fn advance_and_read_back() {
        let store = WatermarkStore::new();
        store.advance("alice", "100").await;
        assert_eq!(store.get("alice").await, "100");
        store.advance("alice", "200").await;
        assert_eq!(store.get("alice").await, "200");
    }

    #[tokio::test]
    async fn never_decreases() {
        let store = WatermarkStore::new();
        store.advance("alice", "200").await;
        store.advance("alice", "150").await;
        assert_eq!(store.get("alice").await, "200");
        store.advance("alice", "200").await;
        assert_eq!(store.get("alice").await, "200");
    }

    #[tokio::test]
    async fn subjects_are_independent() {
        let store = WatermarkStore::new();
        store.advance("alice", "100").await;
        store.advance("bob", "999").await;
        assert_eq!(store.get("alice").await, "100");
        assert_eq!(store.get("bob").await, "999");
    }

    #[tokio::test]
    async fn empty_candidate_ignored() {
        let store = WatermarkStore::new();
        store.advance("alice", "").await;
        assert_eq!(store.get("alice").await, "");
        assert!(store.snapshot().await.is_empty());
    }
}
