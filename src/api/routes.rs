//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, events_handler, health_handler, invalidate_handler, list_watches_handler,
    stats_handler, unwatch_handler, validate_handler, watch_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /stats` - Per-category cache statistics
/// - `DELETE /cache` - Clear every cache
/// - `GET /watch` - List watched files
/// - `POST /watch` - Start watching a file
/// - `POST /unwatch` - Stop watching a file
/// - `POST /validate` - Check a watched file for changes
/// - `POST /invalidate` - Clear every cache on behalf of a file
/// - `GET /events` - Recent invalidation events
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .route("/watch", get(list_watches_handler).post(watch_handler))
        .route("/unwatch", post(unwatch_handler))
        .route("/validate", post(validate_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/events", get(events_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
