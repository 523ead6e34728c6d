//! Store error types.

use thiserror::Error;

/// Error type for bookmark store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Local validation rejected the input before any network call
    #[error("{0}")]
    Validation(String),

    /// The backend rejected the operation
    #[error("Backend error: {0}")]
    Api(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
