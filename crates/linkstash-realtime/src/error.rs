//! Realtime error types.

use thiserror::Error;

/// Error type for realtime channel operations.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The channel has been closed and cannot be reused
    #[error("Channel is closed")]
    Closed,

    /// A channel is already active for a different user
    #[error("Channel already active for user {0}")]
    ActiveForOtherUser(String),

    /// Failed to send a frame
    #[error("Failed to send frame: {0}")]
    Send(String),
}

/// Result type alias using RealtimeError.
pub type RealtimeResult<T> = Result<T, RealtimeError>;
