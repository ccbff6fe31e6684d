//! Sequence-checked application of update batches to a two-sided book.
//!
//! The engine only detects gaps; it never patches them. A batch whose
//! sequence does not advance past the watermark is rejected with
//! [`ApplyOutcome::ResyncRequired`] and the caller is expected to start a
//! fresh subscription cycle.

use rustc_hash::FxHashSet;
use rust_decimal::prelude::ToPrimitive;

use super::ladder::{LevelChange, LevelLadder, RestingLevel};
use crate::error::Error;
use crate::types::{Price, Sequence, Side, UpdateBatch};

/// Result of offering a batch to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The batch was applied; carries the prices it touched
    Applied {
        /// Prices changed by this batch only
        changed: FxHashSet<String>,
    },
    /// The batch did not advance the watermark and was discarded
    ResyncRequired {
        /// Watermark at the time of rejection
        last: Sequence,
        /// Sequence carried by the rejected batch
        got: Sequence,
    },
}

impl ApplyOutcome {
    /// Whether the batch was applied
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }

    /// Convert a rejection into [`Error::SequenceGap`]
    ///
    /// # Errors
    ///
    /// Returns the gap as an error when the batch was not applied.
    pub fn into_result(self) -> Result<FxHashSet<String>, Error> {
        match self {
            ApplyOutcome::Applied { changed } => Ok(changed),
            ApplyOutcome::ResyncRequired { last, got } => Err(Error::SequenceGap { last, got }),
        }
    }
}

/// Reconciled state of one symbol's book.
///
/// Owns the bid and ask ladders, the sequence watermark and the set of
/// prices touched by the most recent applied batch.
///
/// # Design Decisions
///
/// 1. **Validate, then mutate**: every level in a batch is parsed before
///    either ladder is touched, so a malformed batch never leaves the book
///    half-updated.
///
/// 2. **Watermark of 0 means empty**: the first batch must carry a
///    sequence of at least 1.
///
/// 3. **No retransmission**: rejected batches are dropped; recovery is the
///    caller's job.
#[derive(Debug, Clone)]
pub struct ReconciliationState {
    bids: LevelLadder,
    asks: LevelLadder,
    last_sequence: Sequence,
    changed_prices: FxHashSet<String>,
}

impl ReconciliationState {
    /// Create an empty book with no batch applied
    #[must_use]
    pub fn new() -> Self {
        Self {
            bids: LevelLadder::new(Side::Bid),
            asks: LevelLadder::new(Side::Ask),
            last_sequence: 0,
            changed_prices: FxHashSet::default(),
        }
    }

    /// Offer a batch to the book
    ///
    /// Stale or duplicate batches (`sequence <= last_sequence`) are
    /// rejected with [`ApplyOutcome::ResyncRequired`] and leave the book
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedBatch`] if any level fails to parse. The
    /// book, watermark and changed set are untouched in that case.
    pub fn apply(&mut self, batch: &UpdateBatch) -> Result<ApplyOutcome, Error> {
        if batch.sequence <= self.last_sequence {
            return Ok(ApplyOutcome::ResyncRequired {
                last: self.last_sequence,
                got: batch.sequence,
            });
        }

        let (bid_levels, ask_levels) = batch.parse_levels()?;

        let mut changed = FxHashSet::default();
        for level in &bid_levels {
            if self.bids.upsert(level) != LevelChange::Absent {
                changed.insert(level.raw_price.clone());
            }
        }
        for level in &ask_levels {
            if self.asks.upsert(level) != LevelChange::Absent {
                changed.insert(level.raw_price.clone());
            }
        }

        self.last_sequence = batch.sequence;
        self.changed_prices.clone_from(&changed);

        Ok(ApplyOutcome::Applied { changed })
    }

    /// Drop all levels and the watermark, as at subscription start
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.last_sequence = 0;
        self.changed_prices.clear();
    }

    /// Highest sequence applied so far (0 if none)
    #[must_use]
    pub const fn last_sequence(&self) -> Sequence {
        self.last_sequence
    }

    /// Prices touched by the most recently applied batch
    #[must_use]
    pub fn changed_prices(&self) -> &FxHashSet<String> {
        &self.changed_prices
    }

    /// Ladder for one side
    #[must_use]
    pub fn ladder(&self, side: Side) -> &LevelLadder {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Bid ladder
    #[must_use]
    pub fn bids(&self) -> &LevelLadder {
        &self.bids
    }

    /// Ask ladder
    #[must_use]
    pub fn asks(&self) -> &LevelLadder {
        &self.asks
    }

    /// Highest bid
    #[must_use]
    pub fn best_bid(&self) -> Option<&RestingLevel> {
        self.bids.best()
    }

    /// Lowest ask
    #[must_use]
    pub fn best_ask(&self) -> Option<&RestingLevel> {
        self.asks.best()
    }

    /// Best ask minus best bid, or `None` if either side is empty
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }

    /// Average of best bid and best ask
    #[must_use]
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid
                .price
                .checked_add(ask.price)
                .and_then(|sum| (sum / Price::TWO).to_f64()),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    ///
    /// This shouldn't happen on a healthy feed but is useful for validation.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Whether both ladders are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

impl Default for ReconciliationState {
    fn default() -> Self {
        Self::new()
    }
}
