//! Cache Statistics Module
//!
//! Running counters kept by each cache and the snapshot exported from them.

use serde::{Deserialize, Serialize};

// == Cache Counters ==
/// Monotonic counters owned by a cache and updated under its lock.
#[derive(Debug, Clone, Default)]
pub struct CacheCounters {
    /// Number of successful lookups
    pub hits: u64,
    /// Number of failed lookups (absent, stale fingerprint or expired)
    pub misses: u64,
    /// Number of entries removed to make room
    pub evictions: u64,
    /// Number of entries removed because their TTL elapsed
    pub expirations: u64,
}

impl CacheCounters {
    // == Constructor ==
    /// Creates counters with everything at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}

// == Cache Statistics ==
/// Point-in-time snapshot of a single cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStatistics {
    /// Current number of entries in the cache
    pub entries_count: usize,
    /// Capacity bound of the cache
    pub max_entries: usize,
    /// Successful lookups since creation
    pub cache_hits: u64,
    /// Failed lookups since creation
    pub cache_misses: u64,
    /// Capacity evictions since creation
    pub evictions: u64,
    /// TTL removals since creation
    pub expirations: u64,
}

impl CacheStatistics {
    // == Constructor ==
    /// Builds a snapshot from the live counters of a cache.
    pub fn snapshot(counters: &CacheCounters, entries_count: usize, max_entries: usize) -> Self {
        Self {
            entries_count,
            max_entries,
            cache_hits: counters.hits,
            cache_misses: counters.misses,
            evictions: counters.evictions,
            expirations: counters.expirations,
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_new() {
        let counters = CacheCounters::new();
        assert_eq!(counters.hits, 0);
        assert_eq!(counters.misses, 0);
        assert_eq!(counters.evictions, 0);
        assert_eq!(counters.expirations, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStatistics::snapshot(&CacheCounters::new(), 0, 20);
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_all_hits() {
        let mut counters = CacheCounters::new();
        counters.record_hit();
        counters.record_hit();
        counters.record_hit();

        let stats = CacheStatistics::snapshot(&counters, 1, 20);
        assert_eq!(stats.hit_rate(), 1.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut counters = CacheCounters::new();
        counters.record_hit();
        counters.record_miss();

        let stats = CacheStatistics::snapshot(&counters, 1, 20);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_snapshot_copies_counters() {
        let mut counters = CacheCounters::new();
        counters.record_miss();
        counters.record_eviction();
        counters.record_eviction();
        counters.record_expiration();

        let stats = CacheStatistics::snapshot(&counters, 4, 5);
        assert_eq!(stats.entries_count, 4);
        assert_eq!(stats.max_entries, 5);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.evictions, 2);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_statistics_serialize() {
        let stats = CacheStatistics::snapshot(&CacheCounters::new(), 2, 20);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["entries_count"], 2);
        assert_eq!(json["max_entries"], 20);
        assert_eq!(json["cache_hits"], 0);
    }
}
