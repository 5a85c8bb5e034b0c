//! API Module
//!
//! HTTP handlers and routing for the cache administration API.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Per-category cache statistics
//! - `DELETE /cache` - Clear every cache
//! - `GET|POST /watch`, `POST /unwatch` - Manage watched dump files
//! - `POST /validate`, `POST /invalidate` - Check or force invalidation
//! - `GET /events` - Recent invalidation events

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
