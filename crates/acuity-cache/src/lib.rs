//! Bounded TTL + LRU caching for analysis results.
//!
//! One in-memory cache, one lock: every get or set runs its full
//! read-check-promote or insert-evict sequence under a single mutex, so
//! concurrent requests can never interleave half-finished bookkeeping.

pub mod cache;
pub mod fingerprint;
pub mod metrics;

pub use cache::ResultCache;
pub use fingerprint::Fingerprint;
pub use metrics::{CacheMetrics, CacheStats};
