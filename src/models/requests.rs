//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::path::PathBuf;

use serde::Deserialize;

/// Upper bound on accepted path length in bytes
pub const MAX_PATH_LENGTH: usize = 4096;

fn validate_path(path: &str) -> Option<String> {
    if path.trim().is_empty() {
        return Some("Path cannot be empty".to_string());
    }
    if path.len() > MAX_PATH_LENGTH {
        return Some(format!(
            "Path exceeds maximum length of {} bytes",
            MAX_PATH_LENGTH
        ));
    }
    None
}

/// Request body naming a single dump file
/// (POST /watch, /unwatch, /validate)
#[derive(Debug, Clone, Deserialize)]
pub struct PathRequest {
    /// Path of the dump file
    pub path: String,
}

impl PathRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_path(&self.path)
    }

    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Request body for a manual invalidation (POST /invalidate)
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    /// File the invalidation is attributed to
    pub path: String,
    /// Optional reason recorded on the event
    #[serde(default)]
    pub reason: Option<String>,
}

impl InvalidateRequest {
    pub const DEFAULT_REASON: &'static str = "manual invalidation";

    pub fn validate(&self) -> Option<String> {
        validate_path(&self.path)
    }

    pub fn path_buf(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }

    /// The supplied reason, or the default when absent or blank.
    pub fn reason(&self) -> &str {
        match self.reason.as_deref() {
            Some(reason) if !reason.trim().is_empty() => reason,
            _ => Self::DEFAULT_REASON,
        }
    }
}
