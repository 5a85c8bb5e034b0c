//! Eviction Policy Module
//!
//! Chooses which entry leaves a full cache.
//!
//! The policy is frequency-first: the entry read the fewest times goes first,
//! and among equally-read entries the one read longest ago. The per-cache
//! sequence stamp settles entries that share a millisecond timestamp.

use std::collections::HashMap;

use crate::cache::CacheEntry;

// == Eviction Rank ==
/// Sort key of an entry for eviction, smallest evicted first.
fn eviction_rank<T>(entry: &CacheEntry<T>) -> (u64, u64, u64) {
    (entry.access_count, entry.accessed_at, entry.sequence)
}

// == Select Victim ==
/// Returns the key of the entry that should be evicted next.
///
/// Returns None if there are no entries.
pub fn select_victim<T>(entries: &HashMap<String, CacheEntry<T>>) -> Option<String> {
    entries
        .iter()
        .min_by_key(|(_, entry)| eviction_rank(entry))
        .map(|(key, _)| key.clone())
}
