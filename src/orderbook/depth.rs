//! Display-ready depth rows derived from a ladder.
//!
//! Each row carries its level's size, the cumulative total from the best
//! price outward, and that total as a percentage of the deepest displayed
//! total (for depth bars).
//!
//! Row order is side-specific. Bids are returned best-first. Asks are
//! returned deepest-first so that, with the ask block stacked above the
//! bid block, the best ask sits directly against the spread:
//!
//! ```text
//!   103  1.0000  4.0000   <- deepest ask
//!   102  2.0000  3.0000
//!   101  1.0000  1.0000   <- best ask
//!   ---- spread ----
//!   100  1.0000  1.0000   <- best bid
//!    99  2.0000  3.0000
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use super::ladder::LevelLadder;
use crate::types::{Side, Size};

/// Fractional digits used when formatting sizes and totals
pub const DISPLAY_DECIMALS: u32 = 4;

/// Default number of levels shown per side
pub const DEFAULT_DEPTH: usize = 11;

/// One rendered row of the depth view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    /// Side the row belongs to
    pub side: Side,
    /// Price string as delivered by the feed
    pub price: String,
    /// Level size, 4 fractional digits
    pub size: String,
    /// Cumulative size from the best price through this row, 4 fractional digits
    pub total: String,
    /// `total / max_total * 100`; 0 when the side is empty
    pub percentage: f64,
}

/// Builds [`DisplayRow`]s from a ladder for a fixed display depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthViewBuilder {
    depth: usize,
}

impl DepthViewBuilder {
    /// Create a builder that shows at most `depth` levels per side
    #[must_use]
    pub const fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Maximum rows per side
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Build the rows for one ladder
    ///
    /// Totals always accumulate from the best price outward, so the row
    /// nearest the spread has `total == size`. Percentages are relative to
    /// the last (deepest) displayed total, which is never exceeded.
    #[must_use]
    pub fn build(&self, ladder: &LevelLadder) -> Vec<DisplayRow> {
        let side = ladder.side();
        let window: Vec<_> = ladder.iter().take(self.depth).collect();

        let mut running = Size::ZERO;
        let totals: Vec<Size> = window
            .iter()
            .map(|level| {
                running = running.saturating_add(level.size);
                running
            })
            .collect();
        let max_total = totals.last().copied().unwrap_or(Size::ZERO);

        let mut rows: Vec<DisplayRow> = window
            .iter()
            .zip(&totals)
            .map(|(level, total)| DisplayRow {
                side,
                price: level.raw_price.clone(),
                size: format_quantity(level.size),
                total: format_quantity(*total),
                percentage: percentage_of(*total, max_total),
            })
            .collect();

        if side == Side::Ask {
            rows.reverse();
        }
        rows
    }
}

impl Default for DepthViewBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

/// Format a quantity with [`DISPLAY_DECIMALS`] fractional digits
#[must_use]
pub fn format_quantity(value: Decimal) -> String {
    let mut fixed = value.round_dp(DISPLAY_DECIMALS);
    fixed.rescale(DISPLAY_DECIMALS);
    fixed.to_string()
}

fn percentage_of(total: Size, max_total: Size) -> f64 {
    if max_total.is_zero() {
        return 0.0;
    }
    let ratio = total.to_f64().unwrap_or(0.0) / max_total.to_f64().unwrap_or(1.0);
    ratio * 100.0
}
