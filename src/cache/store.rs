//! Cache Store Module
//!
//! Capacity-bounded, thread-safe cache combining fingerprint validation, TTL
//! expiry and frequency-first LRU eviction.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::cache::lru::select_victim;
use crate::cache::{CacheCounters, CacheEntry, CacheStatistics, Clock, SystemClock};
use crate::config::CacheConfig;

// == Cache State ==
/// Everything guarded by the cache lock.
#[derive(Debug)]
struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    counters: CacheCounters,
    next_sequence: u64,
}

impl<T> CacheState<T> {
    fn bump_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

// == LRU Cache ==
/// Thread-safe cache of analysis results keyed by string.
///
/// Every operation takes the instance lock for its full duration, so all
/// operations on one cache are totally ordered. Nothing under the lock
/// touches the filesystem.
#[derive(Debug)]
pub struct LruCache<T> {
    /// Label used in logs
    name: String,
    /// Capacity and TTL settings
    config: CacheConfig,
    /// Time source for timestamps and TTL checks
    clock: Arc<dyn Clock>,
    /// Entries and counters
    state: Mutex<CacheState<T>>,
}

impl<T: Clone> LruCache<T> {
    // == Constructor ==
    /// Creates an empty cache using the system clock.
    ///
    /// # Arguments
    /// * `config` - Capacity and TTL settings
    /// * `name` - Label used in log output
    pub fn new(config: CacheConfig, name: impl Into<String>) -> Self {
        Self::with_clock(config, name, Arc::new(SystemClock))
    }

    /// Creates an empty cache driven by the given clock.
    pub fn with_clock(
        mut config: CacheConfig,
        name: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let name = name.into();
        if config.max_entries == 0 {
            warn!(cache = %name, "max_entries of 0 is not allowed, using 1");
            config.max_entries = 1;
        }
        if config.persist_to_disk {
            warn!(
                cache = %name,
                cache_dir = %config.cache_dir.display(),
                "disk persistence requested; entries are kept in memory only"
            );
        }

        Self {
            name,
            config,
            clock,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                counters: CacheCounters::new(),
                next_sequence: 0,
            }),
        }
    }

    // == Get ==
    /// Looks up `key`, returning a copy of the data if it is still valid.
    ///
    /// An entry stored for a different fingerprint, or older than the TTL, is
    /// removed and the lookup counts as a miss.
    ///
    /// # Arguments
    /// * `key` - The cache key
    /// * `expected_hash` - Current fingerprint of the source artifact
    pub fn get(&self, key: &str, expected_hash: &str) -> Option<T> {
        self.lookup(key, expected_hash, true)
    }

    /// Same as [`get`](Self::get) but leaves the hit and miss counters alone.
    ///
    /// For a second look at a key within one logical request that has
    /// already been counted.
    pub fn peek(&self, key: &str, expected_hash: &str) -> Option<T> {
        self.lookup(key, expected_hash, false)
    }

    fn lookup(&self, key: &str, expected_hash: &str, count: bool) -> Option<T> {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        let Some(entry) = state.entries.get(key) else {
            if count {
                state.counters.record_miss();
            }
            trace!(cache = %self.name, key, "cache miss");
            return None;
        };

        if !entry.matches_hash(expected_hash) {
            debug!(
                cache = %self.name,
                key,
                stored = %entry.file_hash,
                current = expected_hash,
                "fingerprint changed, dropping entry"
            );
            state.entries.remove(key);
            if count {
                state.counters.record_miss();
            }
            return None;
        }

        if entry.is_expired(self.config.ttl_secs, now) {
            debug!(
                cache = %self.name,
                key,
                age_secs = entry.age_secs(now),
                "entry expired"
            );
            state.entries.remove(key);
            state.counters.record_expiration();
            if count {
                state.counters.record_miss();
            }
            return None;
        }

        let sequence = state.bump_sequence();
        let entry = state.entries.get_mut(key)?;
        entry.touch(now, sequence);
        let data = entry.data.clone();
        if count {
            state.counters.record_hit();
        }
        trace!(cache = %self.name, key, "cache hit");
        Some(data)
    }

    // == Put ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// If the key is new and the cache is full, the least valuable entry is
    /// evicted first, so the capacity bound holds after every call.
    ///
    /// # Arguments
    /// * `key` - The cache key
    /// * `value` - The value to store
    /// * `file_hash` - Fingerprint of the artifact the value was computed from
    pub fn put(&self, key: impl Into<String>, value: T, file_hash: impl Into<String>) {
        let key = key.into();
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        if !state.entries.contains_key(&key) {
            while state.entries.len() >= self.config.max_entries {
                let Some(victim) = select_victim(&state.entries) else {
                    break;
                };
                state.entries.remove(&victim);
                state.counters.record_eviction();
                debug!(cache = %self.name, key = %victim, "evicted entry");
            }
        }

        let sequence = state.bump_sequence();
        let entry = CacheEntry::new(value, file_hash.into(), now, sequence);
        state.entries.insert(key, entry);
    }

    // == Remove ==
    /// Removes an entry by key, returning whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    // == Clear ==
    /// Removes every entry. Hit and miss counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        debug!(cache = %self.name, removed, "cache cleared");
    }

    // == Contains ==
    /// Checks whether a key is stored, without touching statistics or access
    /// metadata. Stale or expired entries still count as present.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    // == Purge Expired ==
    /// Removes all entries older than the TTL.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        if self.config.ttl_secs == 0 {
            return 0;
        }

        let now = self.clock.now_ms();
        let ttl_secs = self.config.ttl_secs;
        let mut state = self.state.lock();

        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(ttl_secs, now));
        let removed = before - state.entries.len();

        for _ in 0..removed {
            state.counters.record_expiration();
        }
        removed
    }

    // == Statistics ==
    /// Returns a snapshot of the cache statistics.
    pub fn statistics(&self) -> CacheStatistics {
        let state = self.state.lock();
        CacheStatistics::snapshot(&state.counters, state.entries.len(), self.config.max_entries)
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
