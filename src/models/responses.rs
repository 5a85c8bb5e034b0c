//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::cache::CacheStatistics;
use crate::invalidation::InvalidationEvent;
use crate::service::Category;

/// Statistics of one category cache plus its hit rate
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    #[serde(flatten)]
    pub statistics: CacheStatistics,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStatistics> for CategoryStats {
    fn from(statistics: CacheStatistics) -> Self {
        let hit_rate = statistics.hit_rate();
        Self {
            statistics,
            hit_rate,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Per-category statistics keyed by category label
    pub caches: BTreeMap<Category, CategoryStats>,
    /// Entries across all categories
    pub total_entries: usize,
}

impl StatsResponse {
    pub fn new(statistics: BTreeMap<Category, CacheStatistics>) -> Self {
        let total_entries = statistics.values().map(|s| s.entries_count).sum();
        let caches = statistics
            .into_iter()
            .map(|(category, stats)| (category, CategoryStats::from(stats)))
            .collect();
        Self {
            caches,
            total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for POST /watch and POST /unwatch
#[derive(Debug, Clone, Serialize)]
pub struct WatchResponse {
    pub path: String,
    /// Whether the file is watched after the request
    pub watching: bool,
    /// Whether the request changed anything
    pub changed: bool,
}

/// Response body for GET /watch
#[derive(Debug, Clone, Serialize)]
pub struct WatchListResponse {
    pub files: Vec<PathBuf>,
    pub count: usize,
}

impl WatchListResponse {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            count: files.len(),
            files,
        }
    }
}

/// Response body for POST /validate
#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub path: String,
    /// False when a change was detected and the caches were cleared
    pub valid: bool,
}

/// Response body for POST /invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub message: String,
    pub path: String,
    pub reason: String,
}

impl InvalidateResponse {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            message: format!("Caches invalidated for '{}'", path),
            path,
            reason: reason.into(),
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "All caches cleared".to_string(),
        }
    }
}

/// Response body for GET /events
#[derive(Debug, Clone, Serialize)]
pub struct EventsResponse {
    /// Oldest first
    pub events: Vec<InvalidationEvent>,
    pub count: usize,
}

impl EventsResponse {
    pub fn new(events: Vec<InvalidationEvent>) -> Self {
        Self {
            count: events.len(),
            events,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
