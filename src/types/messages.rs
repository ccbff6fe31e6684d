//! Centrifugo client protocol frames (JSON encoding).
//!
//! Commands carry an `id` and exactly one method body:
//!
//! ```json
//! {"id": 1, "connect": {"token": "..."}}
//! {"id": 2, "subscribe": {"channel": "orderbook:BTC-USD"}}
//! ```
//!
//! The server answers with replies correlated by `id`, sends async pushes
//! (publications, disconnects) with no `id`, and pings with an empty
//! object `{}` which the client must echo.

use serde::{Deserialize, Serialize};

/// Command sent to the server
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// Correlation id, echoed in the reply
    pub id: u32,
    /// Method body
    #[serde(flatten)]
    pub method: CommandMethod,
}

/// Command method and its parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandMethod {
    /// Authenticate the connection
    Connect(ConnectRequest),
    /// Subscribe to a channel
    Subscribe(ChannelRequest),
    /// Unsubscribe from a channel
    Unsubscribe(ChannelRequest),
}

/// Parameters for the connect command
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectRequest {
    /// Connection JWT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Client name reported to the server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Parameters for subscribe / unsubscribe
#[derive(Debug, Clone, Serialize)]
pub struct ChannelRequest {
    /// Channel name, e.g. `orderbook:BTC-USD`
    pub channel: String,
}

/// Frame received from the server
///
/// Exactly one of the optional fields is populated for a well-formed
/// frame; a frame with none of them is a server ping.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reply {
    /// Correlation id (0 for pushes and pings)
    #[serde(default)]
    pub id: u32,
    /// Error answer to a command
    pub error: Option<ReplyError>,
    /// Asynchronous push
    pub push: Option<Push>,
    /// Answer to connect
    pub connect: Option<ConnectResult>,
    /// Answer to subscribe
    pub subscribe: Option<serde_json::Value>,
    /// Answer to unsubscribe
    pub unsubscribe: Option<serde_json::Value>,
}

impl Reply {
    /// Whether this frame is a server ping (`{}`)
    #[must_use]
    pub fn is_ping(&self) -> bool {
        self.id == 0
            && self.error.is_none()
            && self.push.is_none()
            && self.connect.is_none()
            && self.subscribe.is_none()
            && self.unsubscribe.is_none()
    }
}

/// Error returned for a command
#[derive(Debug, Clone, Deserialize)]
pub struct ReplyError {
    /// Protocol error code
    pub code: u32,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Result of a successful connect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectResult {
    /// Server-assigned client id
    pub client: Option<String>,
    /// Server version
    pub version: Option<String>,
    /// Server ping interval in seconds
    pub ping: Option<u32>,
    /// Whether the server expects pong replies
    pub pong: Option<bool>,
}

/// Asynchronous server push
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Push {
    /// Channel the push relates to (empty for connection-level pushes)
    #[serde(default)]
    pub channel: String,
    /// Publication on the channel
    #[serde(rename = "pub")]
    pub publication: Option<Publication>,
    /// Server-side disconnect
    pub disconnect: Option<DisconnectPush>,
}

/// Channel publication
#[derive(Debug, Clone, Deserialize)]
pub struct Publication {
    /// Application payload
    pub data: serde_json::Value,
    /// Stream offset, when history is enabled
    pub offset: Option<u64>,
}

/// Disconnect notice from the server
#[derive(Debug, Clone, Deserialize)]
pub struct DisconnectPush {
    /// Disconnect code
    pub code: u32,
    /// Disconnect reason
    #[serde(default)]
    pub reason: String,
}
