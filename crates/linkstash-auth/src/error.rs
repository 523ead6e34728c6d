//! Auth error types.

use thiserror::Error;

/// Error type for session guard operations.
#[derive(Error, Debug)]
pub enum AuthError {
    /// OAuth callback flow error
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// Identity layer returned an unexpected response
    #[error("Identity layer error: {0}")]
    Identity(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Session storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
