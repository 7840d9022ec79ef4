use crate::client::FetchResult;
use crate::error::FetchError;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// A fetched response and the moment it was fetched
#[derive(Debug)]
pub struct CacheEntry {
    pub key: String,
    pub value: FetchResult,
    pub fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.fetched_at) < ttl
    }
}

/// In-memory TTL cache of raw endpoint responses, keyed by endpoint
///
/// Entries are never swept; staleness is checked when an entry is read.
/// Concurrent misses for the same key are not coalesced and may each fetch.
pub struct ResponseCache {
    // Entries are replaced wholesale, never mutated, so readers always
    // observe a complete entry
    entries: DashMap<String, Arc<CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any
    pub fn get(&self, key: &str) -> Option<FetchResult> {
        // Clone the Arc out so the shard lock is released immediately
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;

        if entry.is_fresh(self.ttl, Instant::now()) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: &str, value: FetchResult) {
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            fetched_at: Instant::now(),
        };
        self.entries.insert(key.to_string(), Arc::new(entry));
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the fresh entry for `key`, or run `fetch` and store its result
    ///
    /// Failed fetches are not stored, so the next call fetches again.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<FetchResult, FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FetchResult, FetchError>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::trace!(endpoint = key, "Serving response from cache");
            crate::metrics::record_cache_lookup(key, true);
            return Ok(hit);
        }
        crate::metrics::record_cache_lookup(key, false);

        let fresh = fetch().await?;
        self.insert(key, fresh.clone());

        tracing::debug!(
            endpoint = key,
            ttl_seconds = self.ttl.as_secs(),
            "Cached fresh response"
        );

        Ok(fresh)
    }
}
