//! Transport collaborators.
//!
//! The session drives any [`Transport`]: something that can connect,
//! subscribe to a channel and yield [`TransportEvent`]s. The
//! [`centrifugo`] module provides the WebSocket implementation.

pub mod centrifugo;

use std::future::Future;

pub use centrifugo::CentrifugoClient;

use crate::error::Error;

/// Event emitted by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Handshake started
    Connecting,
    /// Connection established and authenticated
    Connected,
    /// Connection lost or closed
    Disconnected {
        /// Why the connection ended
        reason: String,
    },
    /// Payload published on a channel
    Publication {
        /// Channel name
        channel: String,
        /// Raw JSON payload
        data: serde_json::Value,
    },
    /// The server refused or dropped a subscription
    SubscriptionError {
        /// Channel name
        channel: String,
        /// Error message
        message: String,
    },
}

/// Pub/sub transport driven by the session loop.
///
/// Implementations report lifecycle changes through
/// [`next_event`](Transport::next_event) rather than return values: a
/// failed `connect` still yields `Connecting` followed by `Disconnected`.
///
/// `next_event` must be cancel-safe; the session polls it inside
/// `tokio::select!` alongside its timers. It should stay pending while
/// there is nothing to report and return `None` only once the transport
/// is permanently finished.
pub trait Transport: Send {
    /// Open the connection
    fn connect(&mut self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Close the connection
    fn disconnect(&mut self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Subscribe to a channel
    fn subscribe(&mut self, channel: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Unsubscribe from a channel
    fn unsubscribe(&mut self, channel: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Wait for the next event
    fn next_event(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;
}
