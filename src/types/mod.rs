//! Wire and domain types.
//!
//! - [`level`] - Price levels and incremental update batches
//! - [`messages`] - Centrifugo client protocol frames

pub mod level;
pub mod messages;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use level::{ParsedLevel, PriceLevel, UpdateBatch};

/// Decimal price of a level
///
/// Prices arrive as strings and are parsed into exact decimals so that
/// `"99.5" < "100"` holds numerically, not lexicographically.
pub type Price = rust_decimal::Decimal;

/// Resting size at a level
pub type Size = rust_decimal::Decimal;

/// Sequence number carried by each update batch
pub type Sequence = u64;

/// Side of the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side, best price is the highest
    Bid,
    /// Sell side, best price is the lowest
    Ask,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("bid"),
            Side::Ask => f.write_str("ask"),
        }
    }
}

/// Supervisory connection state for one subscription
///
/// `Disconnected` is both the initial state and the state re-entered at
/// the end of every connection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No live connection
    #[default]
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Connected and (expected to be) receiving updates
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => f.write_str("disconnected"),
            ConnectionState::Connecting => f.write_str("connecting"),
            ConnectionState::Connected => f.write_str("connected"),
        }
    }
}
