//! # Relay Error Types
//!
//! Error types for the scan relay.

use thiserror::Error;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Relay error type.
///
/// The relay is deliberately tolerant at the per-client level (a slow or
/// closed client is skipped, not an error); these variants cover failures
/// of the relay itself.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Failed to bind or serve the WebSocket endpoint.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// An internal control channel closed unexpectedly.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::TransportError(err.to_string())
    }
}
