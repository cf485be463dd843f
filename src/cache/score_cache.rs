//! In-memory score cache (moka, LRU with TTL).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::{debug, warn};

use super::types::{CacheKey, CacheStats, ScoreEntry};
use crate::constants::{DEFAULT_CACHE_MAX_SIZE, DEFAULT_CACHE_TTL_SECS};

/// Shared memo of full scored candidate sets.
///
/// Entries are immutable once written and handed out behind an `Arc`, so a reader always sees a
/// complete entry. A `set` replaces the previous entry for the key and restarts its TTL.
pub struct ScoreCache {
    entries: Cache<CacheKey, Arc<ScoreEntry>>,
    ttl: Duration,
    max_size: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for ScoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCache")
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            DEFAULT_CACHE_MAX_SIZE,
        )
    }
}

impl ScoreCache {
    pub fn new(ttl: Duration, max_size: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_size)
            .time_to_live(ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            entries,
            ttl,
            max_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[inline]
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Returns the live entry for `key`.
    ///
    /// Expired entries are never returned, swept or not. An entry with an empty id or a
    /// non-finite score is dropped and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<ScoreEntry>> {
        let entry = self.live_entry(key);
        self.record(key, entry.is_some());
        entry
    }

    /// Cached scores for `ids`, in the order given.
    ///
    /// A hit requires the entry to cover every id; anything less counts as a miss.
    pub fn lookup<S: AsRef<str>>(&self, key: &CacheKey, ids: &[S]) -> Option<Vec<f32>> {
        let scores = self.live_entry(key).and_then(|entry| entry.scores_for(ids));
        self.record(key, scores.is_some());
        scores
    }

    fn live_entry(&self, key: &CacheKey) -> Option<Arc<ScoreEntry>> {
        let entry = self
            .entries
            .get(key)
            .filter(|entry| entry.inserted_at().elapsed() < self.ttl)?;

        if entry.is_well_formed() {
            Some(entry)
        } else {
            warn!(?key, "Discarding malformed score cache entry");
            self.entries.invalidate(key);
            None
        }
    }

    fn record(&self, key: &CacheKey, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(?key, "Score cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(?key, "Score cache miss");
        }
    }

    /// Stores the full ranked `(id, score)` list for `key`, replacing any previous entry.
    pub fn set(&self, key: CacheKey, scores: Vec<(String, f32)>) {
        self.entries.insert(key, Arc::new(ScoreEntry::new(scores)));
        self.entries.run_pending_tasks();
    }

    /// Removes the entry for `key`, if any.
    pub fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }

    /// Live entry count after pending evictions and expirations are applied.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}
