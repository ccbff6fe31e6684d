//! Shared, read-mostly view of a live book for the presentation layer.
//!
//! This module provides [`BookHandle`], a cheaply cloneable handle over the
//! reconciled book and its connection state.
//!
//! # Design
//!
//! The session task is the only writer. It takes the write lock once per
//! applied batch or connection transition; render code takes the read
//! lock for the duration of one query. `parking_lot::RwLock` keeps both
//! paths short and never poisons.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use serde::Serialize;

use super::depth::{DepthViewBuilder, DisplayRow, DEFAULT_DEPTH};
use super::ReconciliationState;
use crate::types::{ConnectionState, Sequence, Side};

/// Everything the presentation layer needs for one render pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthSnapshot {
    /// Ask rows, deepest first (best ask last)
    pub asks: Vec<DisplayRow>,
    /// Bid rows, best first
    pub bids: Vec<DisplayRow>,
    /// Prices touched by the most recent batch
    pub changed_prices: Vec<String>,
    /// Connection state at the time of the snapshot
    pub connection: ConnectionState,
    /// Watermark at the time of the snapshot
    pub sequence: Sequence,
}

#[derive(Debug, Default)]
struct Shared {
    book: ReconciliationState,
    connection: ConnectionState,
}

/// Thread-safe handle to one symbol's live book.
///
/// # Example
///
/// ```rust
/// use orderbook_sync::orderbook::BookHandle;
/// use orderbook_sync::types::{ConnectionState, Side};
///
/// let handle = BookHandle::new();
/// assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
/// assert!(handle.display_rows(Side::Bid, 11).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BookHandle {
    inner: Arc<RwLock<Shared>>,
    depth: usize,
}

impl BookHandle {
    /// Create a handle over an empty book with the default depth
    #[must_use]
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_DEPTH)
    }

    /// Create a handle whose [`view`](Self::view) shows `depth` levels per side
    #[must_use]
    pub fn with_depth(depth: usize) -> Self {
        Self {
            inner: Arc::default(),
            depth,
        }
    }

    /// Configured display depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// [`snapshot`](Self::snapshot) at the configured depth
    #[must_use]
    pub fn view(&self) -> DepthSnapshot {
        self.snapshot(self.depth)
    }

    /// Rows for one side, at most `depth` of them
    #[must_use]
    pub fn display_rows(&self, side: Side, depth: usize) -> Vec<DisplayRow> {
        let shared = self.inner.read();
        DepthViewBuilder::new(depth).build(shared.book.ladder(side))
    }

    /// Current supervisory connection state
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.read().connection
    }

    /// Prices touched by the most recent batch
    ///
    /// Valid until the next batch is applied.
    #[must_use]
    pub fn changed_prices(&self) -> FxHashSet<String> {
        self.inner.read().book.changed_prices().clone()
    }

    /// Highest sequence applied so far
    #[must_use]
    pub fn last_sequence(&self) -> Sequence {
        self.inner.read().book.last_sequence()
    }

    /// Build both sides plus highlight and connection info under one lock
    #[must_use]
    pub fn snapshot(&self, depth: usize) -> DepthSnapshot {
        let shared = self.inner.read();
        let builder = DepthViewBuilder::new(depth);
        let mut changed_prices: Vec<String> =
            shared.book.changed_prices().iter().cloned().collect();
        changed_prices.sort_unstable();

        DepthSnapshot {
            asks: builder.build(shared.book.asks()),
            bids: builder.build(shared.book.bids()),
            changed_prices,
            connection: shared.connection,
            sequence: shared.book.last_sequence(),
        }
    }

    /// Run a closure against the book under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&ReconciliationState) -> R) -> R {
        f(&self.inner.read().book)
    }

    /// Mutate the book under the write lock
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut ReconciliationState) -> R) -> R {
        f(&mut self.inner.write().book)
    }

    /// Publish a connection state transition
    pub(crate) fn set_connection_state(&self, state: ConnectionState) {
        self.inner.write().connection = state;
    }
}

impl Default for BookHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceLevel, UpdateBatch};

    fn seeded() -> BookHandle {
        let handle = BookHandle::new();
        let batch = UpdateBatch::new(
            vec![PriceLevel::new("100", "1"), PriceLevel::new("99", "2")],
            vec![PriceLevel::new("101", "1"), PriceLevel::new("102", "2")],
            1,
        );
        handle.write(|book| book.apply(&batch)).unwrap();
        handle
    }

    #[test]
    fn test_display_rows() {
        let handle = seeded();
        let bids = handle.display_rows(Side::Bid, 11);
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].price, "100");

        let asks = handle.display_rows(Side::Ask, 1);
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].price, "101");
    }

    #[test]
    fn test_clones_share_state() {
        let handle = seeded();
        let other = handle.clone();
        handle.set_connection_state(ConnectionState::Connected);

        assert_eq!(other.connection_state(), ConnectionState::Connected);
        assert_eq!(other.last_sequence(), 1);
    }

    #[test]
    fn test_snapshot() {
        let handle = seeded();
        let snapshot = handle.snapshot(11);

        assert_eq!(snapshot.asks.last().unwrap().price, "101");
        assert_eq!(snapshot.bids.first().unwrap().price, "100");
        assert_eq!(snapshot.changed_prices, vec!["100", "101", "102", "99"]);
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.connection, ConnectionState::Disconnected);
    }

    #[test]
    fn test_view_uses_configured_depth() {
        let handle = BookHandle::with_depth(1);
        let batch = UpdateBatch::new(
            vec![PriceLevel::new("100", "1"), PriceLevel::new("99", "2")],
            vec![],
            1,
        );
        handle.write(|book| book.apply(&batch)).unwrap();

        assert_eq!(handle.depth(), 1);
        assert_eq!(handle.view().bids.len(), 1);
        assert_eq!(BookHandle::new().depth(), 11);
    }

    #[test]
    fn test_read_closure() {
        let handle = seeded();
        assert_eq!(handle.read(|book| book.bids().len()), 2);
        assert!(handle.changed_prices().contains("99"));
    }
}
