//! # Error Types
//!
//! Custom error types for the tracker core using `thiserror`.

use thiserror::Error;

/// Main error type for the tracker core
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Configuration file parsing errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration values out of range
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No session record exists for the requested identifier
    #[error("Session {0} not found")]
    SessionNotFound(u32),

    /// A session record exists on disk but cannot be parsed.
    ///
    /// Kept distinct from [`TrackerError::SessionNotFound`] so callers can
    /// tell a missing record from a damaged one.
    #[error("Session record {id} is corrupt: {source}")]
    CorruptRecord {
        id: u32,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed sync protocol request
    #[error("Sync request error: {0}")]
    SyncRequest(String),
}

/// Result type alias for the tracker core
pub type Result<T> = std::result::Result<T, TrackerError>;
