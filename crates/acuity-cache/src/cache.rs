//! Bounded, time-expiring, least-recently-used cache.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use crate::metrics::{CacheMetrics, CacheStats};

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded TTL + LRU cache keyed by fingerprint strings.
///
/// `get` misses on absent keys, drops and misses on expired entries, and
/// promotes live entries to most-recently-used. `set` inserts or overwrites
/// at most-recently-used with a fresh timestamp; when the entry count would
/// exceed capacity, exactly the least-recently-used entry is evicted.
/// Concurrent sets on the same key are last-writer-wins.
pub struct ResultCache<V> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
    metrics: CacheMetrics,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache holding at most `capacity` entries, each living at
    /// most `ttl` after insertion. A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            metrics: CacheMetrics::new(),
        }
    }

    /// Look up a key, purging it first if its TTL elapsed.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();

        let expired = entries
            .peek(key)
            .map(|entry| entry.inserted_at.elapsed() > self.ttl)
            .unwrap_or(false);
        if expired {
            entries.pop(key);
            self.metrics.record_expiration();
            self.metrics.record_miss();
            debug!(key, "cache entry expired");
            return None;
        }

        match entries.get(key) {
            Some(entry) => {
                self.metrics.record_hit();
                debug!(key, "cache hit");
                Some(entry.value.clone())
            }
            None => {
                self.metrics.record_miss();
                debug!(key, "cache miss");
                None
            }
        }
    }

    /// Insert or overwrite a key with a fresh timestamp.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let mut entries = self.entries.lock();

        let displaced = entries.push(
            key.clone(),
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );

        // push returns the old value on overwrite and the LRU entry on a
        // capacity eviction; only the latter counts as an eviction.
        if let Some((displaced_key, _)) = displaced {
            if displaced_key != key {
                self.metrics.record_eviction();
                debug!(key = displaced_key, "cache entry evicted");
            }
        }
    }

    /// Number of entries currently held, including not-yet-purged expired
    /// ones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of hit/miss/eviction counters.
    pub fn stats(&self) -> CacheStats {
        self.metrics.snapshot()
    }
}
