//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::io;
use std::sync::Arc;

use axum::{extract::State, Json};
use tracing::info;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::invalidation::{CacheInvalidationService, EventLog};
use crate::models::{
    ClearResponse, EventsResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    PathRequest, StatsResponse, ValidateResponse, WatchListResponse, WatchResponse,
};
use crate::service::CachingService;

/// Number of invalidation events kept for GET /events
pub const EVENT_LOG_CAPACITY: usize = 100;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Analysis result caches
    pub caching: Arc<CachingService>,
    /// File watching and invalidation
    pub invalidation: Arc<CacheInvalidationService>,
    /// Recent invalidation events, fed by a subscription
    pub events: Arc<EventLog>,
}

impl AppState {
    /// Creates a new AppState and subscribes its event log to `invalidation`.
    pub fn new(caching: Arc<CachingService>, invalidation: Arc<CacheInvalidationService>) -> Self {
        let events = Arc::new(EventLog::new(EVENT_LOG_CAPACITY));
        let log = Arc::clone(&events);
        invalidation.subscribe(move |event| log.record(event));

        Self {
            caching,
            invalidation,
            events,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// # Errors
    /// Fails if the invalidation thread cannot be started.
    pub fn from_config(config: &Config) -> io::Result<Self> {
        let caching = Arc::new(CachingService::new(config.cache.clone()));
        let invalidation = Arc::new(CacheInvalidationService::with_debounce(
            Arc::clone(&caching),
            config.watch_debounce(),
        )?);
        Ok(Self::new(caching, invalidation))
    }
}

/// Runs watcher setup, file metadata reads and subscriber callbacks on the
/// blocking pool.
async fn run_blocking<R, F>(work: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| CacheError::Internal(format!("Blocking task failed: {}", err)))
}

fn validated(req: &PathRequest) -> Result<()> {
    match req.validate() {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
///
/// Returns per-category cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.caching.all_statistics()))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.caching.clear_all_caches();
    Json(ClearResponse::cleared())
}

/// Handler for GET /watch
pub async fn list_watches_handler(State(state): State<AppState>) -> Json<WatchListResponse> {
    Json(WatchListResponse::new(state.invalidation.watched_files()))
}

/// Handler for POST /watch
///
/// Starts watching an existing file. Watching an already watched file
/// succeeds with `changed: false`.
pub async fn watch_handler(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> Result<Json<WatchResponse>> {
    validated(&req)?;
    let path = req.path_buf();
    let invalidation = Arc::clone(&state.invalidation);

    let outcome = run_blocking(move || {
        if !path.exists() {
            return None;
        }
        let changed = invalidation.watch_file(&path);
        Some((changed, invalidation.is_watching(&path)))
    })
    .await?;

    let Some((changed, watching)) = outcome else {
        return Err(CacheError::NotFound(format!("File not found: {}", req.path)));
    };
    if !watching {
        return Err(CacheError::Watch(format!("Could not watch {}", req.path)));
    }

    Ok(Json(WatchResponse {
        path: req.path,
        watching: true,
        changed,
    }))
}

/// Handler for POST /unwatch
pub async fn unwatch_handler(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> Result<Json<WatchResponse>> {
    validated(&req)?;
    let path = req.path_buf();
    let invalidation = Arc::clone(&state.invalidation);
    let changed = run_blocking(move || invalidation.unwatch_file(&path)).await?;

    Ok(Json(WatchResponse {
        path: req.path,
        watching: false,
        changed,
    }))
}

/// Handler for POST /validate
///
/// Compares a watched file against its recorded hash, invalidating on change.
pub async fn validate_handler(
    State(state): State<AppState>,
    Json(req): Json<PathRequest>,
) -> Result<Json<ValidateResponse>> {
    validated(&req)?;
    let path = req.path_buf();
    let invalidation = Arc::clone(&state.invalidation);
    let valid = run_blocking(move || invalidation.validate_cache_entry(&path)).await?;

    Ok(Json(ValidateResponse {
        path: req.path,
        valid,
    }))
}

/// Handler for POST /invalidate
///
/// Clears every cache on behalf of a file, whether or not it is watched.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let reason = req.reason().to_string();
    info!(path = %req.path, reason = %reason, "manual invalidation requested");
    let path = req.path_buf();
    let invalidation = Arc::clone(&state.invalidation);
    let event_reason = reason.clone();
    run_blocking(move || invalidation.invalidate_for_file(&path, &event_reason)).await?;

    Ok(Json(InvalidateResponse::new(req.path, reason)))
}

/// Handler for GET /events
pub async fn events_handler(State(state): State<AppState>) -> Json<EventsResponse> {
    Json(EventsResponse::new(state.events.recent()))
}
