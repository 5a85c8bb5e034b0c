//! Invalidation Module
//!
//! File watching, explicit validation and change events for the analysis
//! caches.

mod event;
mod file_hash;
mod service;
mod watcher;

pub use event::{EventLog, InvalidationCallback, InvalidationEvent, SubscriptionId};
pub use file_hash::coarse_file_hash;
pub use service::CacheInvalidationService;
pub use watcher::DEFAULT_DEBOUNCE;
