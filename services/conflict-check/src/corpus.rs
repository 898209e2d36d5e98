//! Corpus cache
//!
//! One snapshot of the remote contact/matter corpus, fetched on first use
//! and replaced wholesale by an explicit refresh. Checks share the current
//! snapshot through an `Arc`, so a refresh never mutates data a running
//! check is reading.

use std::sync::Arc;
use std::time::Instant;

use clio_api::{ContactRecord, MatterRecord};
use serde::Serialize;
use tokio::sync::RwLock;

/// An immutable snapshot of the fetched corpus.
#[derive(Debug)]
pub struct CorpusSnapshot {
    pub contacts: Vec<ContactRecord>,
    pub matters: Vec<MatterRecord>,
    /// True when either fetch hit the page cap with pages remaining
    pub truncated: bool,
    pub fetched_at: Instant,
}

/// Cache stats for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub contacts: usize,
    pub matters: usize,
    pub truncated: bool,
    pub age_seconds: u64,
}

/// Holds the current snapshot, if any.
#[derive(Default)]
pub struct CorpusCache {
    snapshot: RwLock<Option<Arc<CorpusSnapshot>>>,
}

impl CorpusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot, or `None` before the first fetch.
    pub async fn get(&self) -> Option<Arc<CorpusSnapshot>> {
        self.snapshot.read().await.clone()
    }

    /// Replace the snapshot wholesale, returning the stored handle.
    pub async fn put(&self, snapshot: CorpusSnapshot) -> Arc<CorpusSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.snapshot.write().await = Some(snapshot.clone());
        snapshot
    }

    /// Drop the snapshot so the next check refetches.
    pub async fn invalidate(&self) {
        *self.snapshot.write().await = None;
    }

    pub async fn stats(&self) -> Option<CorpusStats> {
        self.snapshot.read().await.as_ref().map(|s| CorpusStats {
            contacts: s.contacts.len(),
            matters: s.matters.len(),
            truncated: s.truncated,
            age_seconds: s.fetched_at.elapsed().as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use clio_api::ContactType;

    fn snapshot(contact_names: &[&str], truncated: bool) -> CorpusSnapshot {
        CorpusSnapshot {
            contacts: contact_names
                .iter()
                .enumerate()
                .map(|(i, name)| ContactRecord {
                    id: i as i64 + 1,
                    name: name.to_string(),
                    contact_type: ContactType::Person,
                    custom_fields: HashMap::new(),
                    phone_numbers: Vec::new(),
                    address: None,
                })
                .collect(),
            matters: Vec::new(),
            truncated,
            fetched_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn cache_starts_empty() {
        let cache = CorpusCache::new();
        assert!(cache.get().await.is_none());
        assert!(cache.stats().await.is_none());
    }

    #[tokio::test]
    async fn put_then_get_returns_the_snapshot() {
        let cache = CorpusCache::new();
        cache.put(snapshot(&["John Smith"], false)).await;

        let current = cache.get().await.unwrap();
        assert_eq!(current.contacts.len(), 1);
        assert_eq!(current.contacts[0].name, "John Smith");
    }

    #[tokio::test]
    async fn put_replaces_wholesale() {
        let cache = CorpusCache::new();
        cache.put(snapshot(&["John Smith"], false)).await;
        cache.put(snapshot(&["Mary Johnson", "Pat Doe"], true)).await;

        let current = cache.get().await.unwrap();
        assert_eq!(current.contacts.len(), 2);
        assert!(current.truncated);
    }

    #[tokio::test]
    async fn invalidate_clears_the_snapshot() {
        let cache = CorpusCache::new();
        cache.put(snapshot(&["John Smith"], false)).await;

        cache.invalidate().await;
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn held_snapshot_survives_invalidation() {
        let cache = CorpusCache::new();
        let held = cache.put(snapshot(&["John Smith"], false)).await;

        cache.invalidate().await;
        assert_eq!(
            held.contacts[0].name, "John Smith",
            "a check holding the snapshot keeps reading it after invalidation"
        );
    }

    #[tokio::test]
    async fn stats_report_counts_and_truncation() {
        let cache = CorpusCache::new();
        cache.put(snapshot(&["John Smith", "Mary Johnson"], true)).await;

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.contacts, 2);
        assert_eq!(stats.matters, 0);
        assert!(stats.truncated);
        assert!(stats.age_seconds < 5, "a fresh snapshot has near-zero age");
    }
}
