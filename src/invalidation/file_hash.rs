//! Coarse change hash for watched files
//!
//! Separate from the cache fingerprint: this one only has to tell whether a
//! watched file moved on since the last look, so it is a single integer.

use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Mixes size and modification time of `path` into one value.
///
/// Returns None if the metadata cannot be read (for example after deletion).
pub fn coarse_file_hash(path: &Path) -> Option<u64> {
    let meta = fs::metadata(path).ok()?;
    let modified = meta
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    Some(mix(&[
        meta.len(),
        modified.as_secs(),
        u64::from(modified.subsec_nanos()),
    ]))
}

/// FNV-1a over the little-endian bytes of each word.
fn mix(words: &[u64]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for word in words {
        for byte in word.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}
