//! Service Module
//!
//! Per-category get-or-compute caching of analysis results keyed by dump file.

mod caching;
mod category;
mod fingerprint;
mod inflight;

pub use caching::{cache_key, CachingService};
pub use category::{Category, CategoryResult};
pub use fingerprint::{fingerprint, is_sentinel, FILE_NOT_FOUND, METADATA_ERROR_PREFIX};
