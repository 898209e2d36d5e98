//! Check orchestration
//!
//! `ConflictService` owns the API client and the corpus cache, and exposes
//! the two operations the routes call: `check` and `refresh_corpus`. A
//! check fetches the corpus when the cache is cold; an explicit refresh
//! always refetches.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use clio_api::ApiClient;
use conflict_rules::{MatchFinding, NewClientQuery, find_conflicts};

use crate::corpus::{CorpusCache, CorpusSnapshot, CorpusStats};
use crate::metrics;

/// What `/check` returns.
#[derive(Debug, Serialize)]
pub struct ConflictReport {
    pub findings: Vec<MatchFinding>,
    pub contacts_scanned: usize,
    pub matters_scanned: usize,
    /// True when the scanned corpus was cut short by the page cap; a
    /// clear result over a truncated corpus is not a guarantee
    pub corpus_truncated: bool,
}

/// What `/corpus/refresh` returns.
#[derive(Debug, Serialize)]
pub struct RefreshSummary {
    pub contacts: usize,
    pub matters: usize,
    pub truncated: bool,
}

pub struct ConflictService {
    api: ApiClient,
    cache: CorpusCache,
    page_size: u32,
    max_pages: u32,
    checks_served: AtomicU64,
    started_at: Instant,
}

impl ConflictService {
    pub fn new(api: ApiClient, page_size: u32, max_pages: u32) -> Self {
        Self {
            api,
            cache: CorpusCache::new(),
            page_size,
            max_pages,
            checks_served: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Run one conflict check against the current corpus.
    ///
    /// A cold cache fetches contacts then matters first. The same query
    /// over an unchanged snapshot yields identical findings.
    pub async fn check(&self, query: &NewClientQuery) -> clio_api::Result<ConflictReport> {
        let corpus = match self.cache.get().await {
            Some(snapshot) => snapshot,
            None => self.fetch_corpus("check").await?,
        };

        let findings = find_conflicts(query, &corpus.contacts, &corpus.matters);
        self.checks_served.fetch_add(1, Ordering::Relaxed);
        info!(
            findings = findings.len(),
            contacts_scanned = corpus.contacts.len(),
            matters_scanned = corpus.matters.len(),
            "conflict check complete"
        );

        Ok(ConflictReport {
            contacts_scanned: corpus.contacts.len(),
            matters_scanned: corpus.matters.len(),
            corpus_truncated: corpus.truncated,
            findings,
        })
    }

    /// Drop the cached corpus and refetch it.
    pub async fn refresh_corpus(&self) -> clio_api::Result<RefreshSummary> {
        self.cache.invalidate().await;
        let snapshot = self.fetch_corpus("manual").await?;
        Ok(RefreshSummary {
            contacts: snapshot.contacts.len(),
            matters: snapshot.matters.len(),
            truncated: snapshot.truncated,
        })
    }

    pub async fn corpus_stats(&self) -> Option<CorpusStats> {
        self.cache.stats().await
    }

    pub fn checks_served(&self) -> u64 {
        self.checks_served.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    async fn fetch_corpus(&self, trigger: &'static str) -> clio_api::Result<Arc<CorpusSnapshot>> {
        let contacts = self.api.list_contacts(self.page_size, self.max_pages).await?;
        let matters = self.api.list_matters(self.page_size, self.max_pages).await?;

        let truncated = contacts.truncated || matters.truncated;
        if truncated {
            warn!(
                contact_pages = contacts.pages_fetched,
                matter_pages = matters.pages_fetched,
                "page cap cut the corpus short; conflict results may be incomplete"
            );
        }
        info!(
            contacts = contacts.records.len(),
            matters = matters.records.len(),
            trigger,
            "corpus fetched"
        );
        metrics::record_corpus_refresh(trigger);

        Ok(self
            .cache
            .put(CorpusSnapshot {
                contacts: contacts.records,
                matters: matters.records,
                truncated,
                fetched_at: Instant::now(),
            })
            .await)
    }
}
