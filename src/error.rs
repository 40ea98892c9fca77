//! Custom error types for the monitor.
//!
//! This module defines the primary error type, `MonitorError`, for the whole
//! library. Using the `thiserror` crate, it provides a consistent way to report
//! the failures the coordinator can run into, from transport problems talking
//! to the experiment backend to invalid operator input.
//!
//! ## Error Hierarchy
//!
//! - **`Transport`**: Wraps `reqwest::Error` for connection, timeout and body
//!   read failures.
//! - **`Status`**: The backend answered, but with a non-success HTTP status.
//! - **`Decode`**: The backend answered with a body that does not match the
//!   expected JSON shape.
//! - **`Url`**: A request path could not be joined onto the configured base URL.
//! - **`NoSelection`**: An operation that targets the selected experiment was
//!   invoked with nothing selected.
//! - **`InvalidInterval`**: The requested capture cadence is outside the
//!   allowed range.
//! - **`Config`**: Loading or validating the configuration failed.
//! - **`Io`**: Local file I/O, e.g. writing an exported archive.
//!
//! None of these are fatal to a running session: capture ticks and live polls
//! log them and carry on.

use crate::config::ConfigError;
use thiserror::Error;

/// Convenience alias for results using the monitor error type.
pub type AppResult<T> = std::result::Result<T, MonitorError>;

/// Every failure the monitor library reports.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {path} returned status {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("Unexpected response body from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("No experiment selected")]
    NoSelection,

    #[error("Capture interval {requested}s exceeds the maximum of {max}s")]
    InvalidInterval { requested: u64, max: u64 },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// True for failures where the backend could not be reached or answered
    /// with something other than success.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            MonitorError::Transport(_) | MonitorError::Status { .. } | MonitorError::Decode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = MonitorError::Status {
            method: "GET",
            path: "/api/data".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "GET /api/data returned status 503");
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_interval_error_display() {
        let err = MonitorError::InvalidInterval {
            requested: 7200,
            max: 3600,
        };
        assert!(err.to_string().contains("7200s"));
        assert!(!err.is_backend_failure());
    }
}
