//! Analysis records and admin API DTOs
//!
//! `analysis` holds the per-category result records that get cached;
//! `requests` and `responses` are the HTTP bodies of the admin surface.

pub mod analysis;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use analysis::{
    CommandLineInfo, DllInfo, MalwareDetection, NetworkConnectionInfo, ProcessInfo,
};
pub use requests::{InvalidateRequest, PathRequest};
pub use responses::{
    CategoryStats, ClearResponse, ErrorResponse, EventsResponse, HealthResponse,
    InvalidateResponse, StatsResponse, ValidateResponse, WatchListResponse, WatchResponse,
};
