//! Error types for the admin API
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the admin API.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Named file is unknown (not present or not watched)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The OS subscription for a file could not be created
    #[error("Watch failed: {0}")]
    Watch(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Watch(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            CacheError::NotFound(msg)
            | CacheError::InvalidRequest(msg)
            | CacheError::Watch(msg)
            | CacheError::Internal(msg) => msg,
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the admin API.
pub type Result<T> = std::result::Result<T, CacheError>;
