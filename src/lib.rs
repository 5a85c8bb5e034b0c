//! Dump Cache - result caching for memory-dump analysis
//!
//! Keeps per-category LRU caches of analysis results keyed by dump file,
//! validated against a file fingerprint and cleared when watched dump files
//! change on disk.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod models;
pub mod service;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheStatistics, LruCache};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
pub use invalidation::{CacheInvalidationService, InvalidationEvent};
pub use service::{CachingService, Category};
pub use tasks::spawn_cleanup_task;
