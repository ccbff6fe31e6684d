//! Price levels and incremental update batches.
//!
//! On the wire a level is a two-element string array and a batch is a
//! delta, not a snapshot:
//!
//! ```json
//! {"bids": [["100.5", "1.25"], ["100.0", "0"]], "asks": [], "sequence": 42}
//! ```
//!
//! A size of zero removes the level.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, Sequence, Size};
use crate::error::Error;

/// Largest absolute price or size accepted from the feed
///
/// Keeps cumulative totals and the 4-digit display scale well inside
/// `Decimal`'s 28 significant digits.
pub const MAX_LEVEL_MAGNITUDE: i64 = 1_000_000_000_000_000;

/// A single `(price, size)` pair as delivered by the feed
///
/// Both fields are kept as the original decimal strings; use
/// [`PriceLevel::parse`] to get numeric values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct PriceLevel {
    /// Price as a decimal string
    pub price: String,
    /// Size as a decimal string (`"0"` deletes the level)
    pub size: String,
}

impl PriceLevel {
    /// Create a level from price and size strings
    pub fn new(price: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            size: size.into(),
        }
    }

    /// Parse both fields into exact decimals
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedBatch`] if either field is not a decimal
    /// number, the size is negative, or either exceeds
    /// [`MAX_LEVEL_MAGNITUDE`].
    pub fn parse(&self) -> Result<ParsedLevel, Error> {
        let price = Price::from_str(&self.price)
            .map_err(|e| Error::malformed(format!("invalid price {:?}: {}", self.price, e)))?;
        let size = Size::from_str(&self.size)
            .map_err(|e| Error::malformed(format!("invalid size {:?}: {}", self.size, e)))?;
        if size.is_sign_negative() && !size.is_zero() {
            return Err(Error::malformed(format!(
                "negative size {:?} at price {:?}",
                self.size, self.price
            )));
        }
        let limit = Decimal::from(MAX_LEVEL_MAGNITUDE);
        if price.abs() > limit || size > limit {
            return Err(Error::malformed(format!(
                "level {:?} x {:?} exceeds magnitude limit",
                self.price, self.size
            )));
        }
        Ok(ParsedLevel {
            price,
            size,
            raw_price: self.price.clone(),
        })
    }
}

impl From<(String, String)> for PriceLevel {
    fn from((price, size): (String, String)) -> Self {
        Self { price, size }
    }
}

impl From<PriceLevel> for (String, String) {
    fn from(level: PriceLevel) -> Self {
        (level.price, level.size)
    }
}

/// A level whose price and size have been validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLevel {
    /// Numeric price (ladder key)
    pub price: Price,
    /// Numeric size
    pub size: Size,
    /// Price string as delivered, kept for display and highlighting
    pub raw_price: String,
}

impl ParsedLevel {
    /// Whether this entry deletes its level
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.size.is_zero()
    }
}

/// Incremental update for both sides of one symbol's book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Bid level changes
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    /// Ask level changes
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    /// Strictly increasing per channel
    pub sequence: Sequence,
}

impl UpdateBatch {
    /// Create a batch from level lists and a sequence number
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>, sequence: Sequence) -> Self {
        Self {
            bids,
            asks,
            sequence,
        }
    }

    /// Decode a publication payload
    ///
    /// # Errors
    ///
    /// Any shape mismatch (missing or non-integer `sequence`, levels that
    /// are not string pairs) is reported as [`Error::MalformedBatch`].
    pub fn from_json(value: serde_json::Value) -> Result<Self, Error> {
        serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string()))
    }

    /// Decode a batch from JSON text
    ///
    /// # Errors
    ///
    /// Same as [`UpdateBatch::from_json`].
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| Error::malformed(e.to_string()))
    }

    /// Parse every level in the batch without touching any book state
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::MalformedBatch`] encountered.
    pub fn parse_levels(&self) -> Result<(Vec<ParsedLevel>, Vec<ParsedLevel>), Error> {
        let bids = self
            .bids
            .iter()
            .map(PriceLevel::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let asks = self
            .asks
            .iter()
            .map(PriceLevel::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((bids, asks))
    }

    /// Total number of level changes carried
    #[must_use]
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    /// Whether the batch carries no level changes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_decode_batch() {
        let batch = UpdateBatch::from_json(json!({
            "bids": [["100.5", "1.25"], ["100", "0"]],
            "asks": [["101", "3"]],
            "sequence": 42
        }))
        .unwrap();

        assert_eq!(batch.sequence, 42);
        assert_eq!(batch.bids[0], PriceLevel::new("100.5", "1.25"));
        assert_eq!(batch.asks.len(), 1);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_missing_sides_default_to_empty() {
        let batch = UpdateBatch::from_json(json!({ "sequence": 7 })).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn test_missing_sequence_is_malformed() {
        let err = UpdateBatch::from_json(json!({ "bids": [], "asks": [] })).unwrap_err();
        assert!(matches!(err, Error::MalformedBatch(_)));
    }

    #[test]
    fn test_fractional_sequence_is_malformed() {
        let err = UpdateBatch::from_json_str(r#"{"bids":[],"asks":[],"sequence":1.5}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedBatch(_)));
    }

    #[test]
    fn test_level_must_be_string_pair() {
        let err = UpdateBatch::from_json(json!({
            "bids": [["100", 1]],
            "sequence": 1
        }))
        .unwrap_err();
        assert!(matches!(err, Error::MalformedBatch(_)));
    }

    #[test]
    fn test_parse_level() {
        let parsed = PriceLevel::new("99.50", "2").parse().unwrap();
        assert_eq!(parsed.price, Decimal::new(995, 1));
        assert_eq!(parsed.raw_price, "99.50");
        assert!(!parsed.is_delete());

        assert!(PriceLevel::new("100", "0.000").parse().unwrap().is_delete());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(PriceLevel::new("abc", "1").parse().is_err());
        assert!(PriceLevel::new("100", "").parse().is_err());
        assert!(PriceLevel::new("100", "-1").parse().is_err());
    }

    #[test]
    fn test_parse_rejects_oversized_values() {
        let huge = "79228162514264337593543950335";
        assert!(matches!(
            PriceLevel::new("100", huge).parse(),
            Err(Error::MalformedBatch(_))
        ));
        assert!(PriceLevel::new(huge, "1").parse().is_err());
        assert!(PriceLevel::new("100", "1000000000000000.0001").parse().is_err());

        let limit = PriceLevel::new("1000000000000000", "1000000000000000")
            .parse()
            .unwrap();
        assert_eq!(limit.size, Decimal::from(MAX_LEVEL_MAGNITUDE));
    }

    #[test]
    fn test_level_serializes_as_pair() {
        let json = serde_json::to_string(&PriceLevel::new("1", "2")).unwrap();
        assert_eq!(json, r#"["1","2"]"#);
    }
}
