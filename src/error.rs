//! Error types for the orderbook-sync crate.
//!
//! Most failure modes in this crate are recovered locally (sequence gaps
//! trigger a resubscribe, silence triggers a reconnect), so these errors
//! mostly travel between the transport, the engine and the session loop.
//! Nothing here is expected to reach the presentation layer.

use thiserror::Error;

/// The main error type for this crate
#[derive(Debug, Error)]
pub enum Error {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint could not be parsed as a URL
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration (missing fields, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Update batch failed validation and was dropped
    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    /// Batch sequence did not advance past the watermark
    #[error("Sequence gap: last applied {last}, got {got}")]
    SequenceGap {
        /// Highest sequence applied so far
        last: u64,
        /// Sequence number carried by the rejected batch
        got: u64,
    },

    /// The pub/sub server answered a command with an error
    #[error("Server error ({code}): {message}")]
    Server {
        /// Protocol error code
        code: u32,
        /// Error message from the server
        message: String,
    },

    /// WebSocket connection closed unexpectedly
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// Operation requires an established connection
    #[error("Not connected")]
    NotConnected,

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
}

impl Error {
    /// Build a [`Error::MalformedBatch`] from anything printable
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedBatch(msg.into())
    }

    /// Whether this error originated from the connection rather than the data
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::WebSocket(_)
                | Error::ConnectionClosed
                | Error::NotConnected
                | Error::Timeout
                | Error::Server { .. }
        )
    }
}
