//! Cache Entry Module
//!
//! Defines a single cached analysis result together with its access metadata.

// == Cache Entry ==
/// A cached value plus the metadata used for validation and eviction.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// Fingerprint of the source artifact when the value was stored
    pub file_hash: String,
    /// Insertion timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Last successful read (Unix milliseconds), never earlier than `created_at`
    pub accessed_at: u64,
    /// Number of successful reads since insertion
    pub access_count: u64,
    /// Per-cache ordering stamp, refreshed on insert and on every hit
    pub sequence: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates a fresh entry stamped at `now_ms`.
    ///
    /// # Arguments
    /// * `data` - The value to store
    /// * `file_hash` - Fingerprint of the artifact the value was computed from
    /// * `now_ms` - Current time in Unix milliseconds
    /// * `sequence` - Ordering stamp assigned by the owning cache
    pub fn new(data: T, file_hash: String, now_ms: u64, sequence: u64) -> Self {
        Self {
            data,
            file_hash,
            created_at: now_ms,
            accessed_at: now_ms,
            access_count: 0,
            sequence,
        }
    }

    // == Touch ==
    /// Records a successful read.
    pub fn touch(&mut self, now_ms: u64, sequence: u64) {
        self.access_count += 1;
        self.accessed_at = now_ms.max(self.created_at);
        self.sequence = sequence;
    }

    // == Is Expired ==
    /// Checks whether the entry has outlived `ttl_secs`.
    ///
    /// A TTL of zero disables expiry. The entry expires only once strictly more
    /// than `ttl_secs` seconds have elapsed since insertion.
    pub fn is_expired(&self, ttl_secs: u64, now_ms: u64) -> bool {
        if ttl_secs == 0 {
            return false;
        }
        now_ms.saturating_sub(self.created_at) > ttl_secs.saturating_mul(1000)
    }

    // == Age ==
    /// Returns the entry age in whole seconds.
    pub fn age_secs(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at) / 1000
    }

    /// Returns true if the entry was stored for the given fingerprint.
    pub fn matches_hash(&self, expected_hash: &str) -> bool {
        self.file_hash == expected_hash
    }
}
