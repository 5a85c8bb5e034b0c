//! Cache Module
//!
//! Bounded in-memory caching with fingerprint validation, TTL expiration and
//! frequency-first LRU eviction.

mod clock;
mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use stats::{CacheCounters, CacheStatistics};
pub use store::LruCache;
