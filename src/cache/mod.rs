//! In-memory result cache.
//!
//! Memoizes metric results keyed by metric identifier and parameters.
//!
//! # Design
//!
//! - Concurrent map, one independent entry per key
//! - Time-based expiry checked on read; stale entries are replaced on recompute
//! - Failed computations are never stored
//! - Only total invalidation (`clear_all`)
//!
//! # Key Format
//!
//! ```text
//! orders_summary                -> TabularResult
//! top_customers?limit=5         -> TabularResult
//! top_customers?limit=10        -> TabularResult
//! ```
//!
//! Two callers missing the same key at once may both compute; the last
//! write wins.

mod hash;
pub use hash::{compute_hash, fingerprint};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::table::TabularResult;

/// Default time-to-live for metric results.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache key: metric identifier plus its canonical parameter string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    metric: String,
    params: String,
}

impl CacheKey {
    pub fn new(metric: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            params: params.into(),
        }
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn params(&self) -> &str {
        &self.params
    }

    /// SHA256 digest of the key, for log correlation.
    pub fn digest(&self) -> String {
        compute_hash(&self.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(&self.metric)
        } else {
            write!(f, "{}?{}", self.metric, self.params)
        }
    }
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() < ttl
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in the cache (fresh or stale).
    pub entry_count: usize,
    /// Reads answered from the cache.
    pub hits: u64,
    /// Reads that found no entry.
    pub misses: u64,
    /// Reads that found an expired entry.
    pub expired: u64,
}

/// Concurrent TTL cache for query results.
pub struct ResultCache<V = TabularResult> {
    entries: DashMap<CacheKey, CacheEntry<V>>,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ResultCache<V> {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// A cache that never stores anything; every call computes.
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    fn with_enabled(enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a fresh entry.
    pub fn get(&self, key: &CacheKey, ttl: Duration) -> Option<V> {
        let entry = self.entries.get(key)?;
        entry.is_fresh(ttl).then(|| entry.value.clone())
    }

    /// Return the cached value for `key` if younger than `ttl`, otherwise run
    /// `compute` and store its successful result.
    pub async fn get_or_compute<F, Fut, E>(&self, key: CacheKey, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !self.enabled {
            return compute().await;
        }

        // The map guard is dropped before awaiting `compute`.
        let cached = match self.entries.get(&key) {
            Some(entry) if entry.is_fresh(ttl) => Some(entry.value.clone()),
            Some(_) => {
                self.expired.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        };

        if let Some(value) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, "cache hit");
            return Ok(value);
        }

        tracing::debug!(key = %key, "cache miss");
        let value = compute().await?;
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                created_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Drop every entry.
    pub fn clear_all(&self) {
        let count = self.entries.len();
        self.entries.clear();
        tracing::info!(entries = count, "result cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }
}
