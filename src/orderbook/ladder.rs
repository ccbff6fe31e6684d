//! One side of the book: a price-keyed collection of resting levels.
//!
//! This implementation uses `BTreeMap` keyed by the decimal price, providing:
//!
//! - O(log n) insertion, deletion, and lookup
//! - Uniqueness of price keys by construction
//! - Ordered iteration in side order (bids descending, asks ascending)

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::Rev;

use crate::error::Error;
use crate::types::{ParsedLevel, Price, PriceLevel, Side, Size};

/// A resting level inside a ladder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingLevel {
    /// Price string as last delivered by the feed
    pub raw_price: String,
    /// Numeric price
    pub price: Price,
    /// Resting size, never zero
    pub size: Size,
}

impl RestingLevel {
    /// Convert back to the wire representation
    #[must_use]
    pub fn to_price_level(&self) -> PriceLevel {
        PriceLevel::new(self.raw_price.clone(), self.size.to_string())
    }
}

/// What an upsert did to the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelChange {
    /// A new price level was created
    Inserted,
    /// An existing level's size was replaced
    Updated,
    /// An existing level was deleted
    Removed,
    /// Delete of a price that was not resting
    Absent,
}

/// Price ladder for a single side of the book.
///
/// # Invariants
///
/// - No two entries share a numeric price (`"100"` and `"100.0"` are the
///   same level)
/// - No entry has a zero size
///
/// # Thread Safety
///
/// Not internally synchronized; the owning
/// [`ReconciliationState`](super::ReconciliationState) is mutated from a
/// single task.
#[derive(Debug, Clone)]
pub struct LevelLadder {
    side: Side,
    /// Sorted ascending by price regardless of side
    levels: BTreeMap<Price, RestingLevel>,
}

impl LevelLadder {
    /// Create an empty ladder for the given side
    #[must_use]
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Which side this ladder holds
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Insert, replace or delete the level at `level.price`
    ///
    /// A zero size removes the level; removing a price that is not resting
    /// is a no-op reported as [`LevelChange::Absent`].
    pub fn upsert(&mut self, level: &ParsedLevel) -> LevelChange {
        if level.is_delete() {
            return match self.levels.remove(&level.price) {
                Some(_) => LevelChange::Removed,
                None => LevelChange::Absent,
            };
        }

        let resting = RestingLevel {
            raw_price: level.raw_price.clone(),
            price: level.price,
            size: level.size,
        };
        match self.levels.insert(level.price, resting) {
            Some(_) => LevelChange::Updated,
            None => LevelChange::Inserted,
        }
    }

    /// Parse and upsert a `(price, size)` string pair
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedBatch`] if either string is not a valid
    /// decimal; the ladder is left untouched in that case.
    pub fn upsert_str(&mut self, price: &str, size: &str) -> Result<LevelChange, Error> {
        let parsed = PriceLevel::new(price, size).parse()?;
        Ok(self.upsert(&parsed))
    }

    /// Iterate levels in side order, best price first
    pub fn iter(&self) -> LadderIter<'_> {
        match self.side {
            Side::Bid => LadderIter::Descending(self.levels.values().rev()),
            Side::Ask => LadderIter::Ascending(self.levels.values()),
        }
    }

    /// The whole ladder as wire levels, best price first
    ///
    /// Bids come out in descending price order, asks ascending.
    #[must_use]
    pub fn sorted_view(&self) -> Vec<PriceLevel> {
        self.iter().map(RestingLevel::to_price_level).collect()
    }

    /// Best level (highest bid / lowest ask)
    #[must_use]
    pub fn best(&self) -> Option<&RestingLevel> {
        self.iter().next()
    }

    /// Look up the level at a price
    #[must_use]
    pub fn get(&self, price: &Price) -> Option<&RestingLevel> {
        self.levels.get(price)
    }

    /// Sum of all resting sizes, saturating at `Decimal::MAX`
    #[must_use]
    pub fn total_size(&self) -> Size {
        self.levels
            .values()
            .fold(Size::ZERO, |total, l| total.saturating_add(l.size))
    }

    /// Number of price levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Whether the ladder has no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Remove every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }
}

/// Iterator over a ladder in side order
#[derive(Debug)]
pub enum LadderIter<'a> {
    /// Ask side
    Ascending(btree_map::Values<'a, Price, RestingLevel>),
    /// Bid side
    Descending(Rev<btree_map::Values<'a, Price, RestingLevel>>),
}

impl<'a> Iterator for LadderIter<'a> {
    type Item = &'a RestingLevel;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            LadderIter::Ascending(it) => it.next(),
            LadderIter::Descending(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            LadderIter::Ascending(it) => it.size_hint(),
            LadderIter::Descending(it) => it.size_hint(),
        }
    }
}

impl ExactSizeIterator for LadderIter<'_> {}
