//! # orderbook-sync
//!
//! A live, self-healing view of a two-sided limit order book driven by an
//! incremental update feed over an unreliable real-time transport.
//!
//! ## Features
//!
//! - **Sequence-checked reconciliation** - stale, duplicate and
//!   out-of-order batches are rejected and trigger a fresh subscription
//! - **Exact decimal ladders** - prices and sizes stay exact, ordering is
//!   numeric, never lexicographic
//! - **Depth views** - truncated, cumulative, percentage-of-max rows ready
//!   for rendering
//! - **Liveness supervision** - silent feeds are forcibly reconnected with
//!   capped exponential backoff, independent of the transport
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orderbook_sync::{Config, OrderbookSession};
//! use orderbook_sync::types::Side;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), orderbook_sync::Error> {
//!     let config = Config::new("wss://feed.example.com/connection/websocket", "BTC-USD")
//!         .with_token("jwt-token");
//!
//!     let session = OrderbookSession::centrifugo(config)?;
//!     let book = session.handle();
//!     tokio::spawn(session.run(std::future::pending()));
//!
//!     loop {
//!         tokio::time::sleep(std::time::Duration::from_millis(250)).await;
//!         println!("[{}]", book.connection_state());
//!         for row in book.display_rows(Side::Ask, 11) {
//!             println!("{:>12} {:>12} {:>12}", row.price, row.size, row.total);
//!         }
//!         for row in book.display_rows(Side::Bid, 11) {
//!             println!("{:>12} {:>12} {:>12}", row.price, row.size, row.total);
//!         }
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`orderbook`] - Ladders, reconciliation engine, depth rows, shared handle
//! - [`connection`] - Liveness monitor, backoff, injectable clocks
//! - [`client`] - Transport trait and the Centrifugo WebSocket client
//! - [`session`] - Event loop wiring transport, engine and monitor together
//! - [`types`] - Wire and domain types
//! - [`config`] - Session configuration
//! - [`error`] - Error types for the crate

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod orderbook;
pub mod session;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::Error;
pub use orderbook::{BookHandle, DisplayRow, ReconciliationState};
pub use session::OrderbookSession;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
