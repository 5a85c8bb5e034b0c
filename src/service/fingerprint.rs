//! Artifact fingerprinting
//!
//! Dumps are routinely several gigabytes, so the fingerprint is built from
//! file metadata (size and modification time) rather than content.

use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Fingerprint of a path that does not exist
pub const FILE_NOT_FOUND: &str = "FILE_NOT_FOUND";

/// Prefix of the fingerprint of a path whose metadata could not be read
pub const METADATA_ERROR_PREFIX: &str = "METADATA_ERROR:";

// == Fingerprint ==
/// Returns the metadata fingerprint of `path`.
///
/// Never fails: a missing file yields [`FILE_NOT_FOUND`] and any other
/// metadata error yields a sentinel built from the error kind.
pub fn fingerprint(path: &Path) -> String {
    let meta = match fs::metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return FILE_NOT_FOUND.to_string(),
        Err(err) => return error_sentinel(&err),
    };

    let modified = match meta.modified() {
        Ok(modified) => modified,
        Err(err) => return error_sentinel(&err),
    };
    // mtimes before the epoch collapse to zero
    let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();

    format!(
        "{}-{}.{:09}",
        meta.len(),
        since_epoch.as_secs(),
        since_epoch.subsec_nanos()
    )
}

/// Returns true for the fingerprints produced when metadata is unavailable.
pub fn is_sentinel(fingerprint: &str) -> bool {
    fingerprint == FILE_NOT_FOUND || fingerprint.starts_with(METADATA_ERROR_PREFIX)
}

fn error_sentinel(err: &io::Error) -> String {
    format!("{}{:?}", METADATA_ERROR_PREFIX, err.kind())
}
