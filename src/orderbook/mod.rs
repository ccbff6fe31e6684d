//! Order book reconciliation and depth views.
//!
//! This module provides the state-reconciliation core:
//!
//! - [`LevelLadder`] - one side's price-keyed levels, sorted on demand
//! - [`ReconciliationState`] - sequence-checked batch application
//! - [`DepthViewBuilder`] - cumulative depth rows for display
//! - [`BookHandle`] - shared read access for the presentation layer
//!
//! # Example
//!
//! ```rust
//! use orderbook_sync::orderbook::{ApplyOutcome, DepthViewBuilder, ReconciliationState};
//! use orderbook_sync::types::{PriceLevel, UpdateBatch};
//!
//! let mut book = ReconciliationState::new();
//!
//! let batch = UpdateBatch::new(
//!     vec![PriceLevel::new("100", "1"), PriceLevel::new("99", "2")],
//!     vec![PriceLevel::new("101", "1.5")],
//!     1,
//! );
//! assert!(book.apply(&batch).unwrap().is_applied());
//!
//! // A replay of the same sequence is rejected
//! assert!(matches!(
//!     book.apply(&batch).unwrap(),
//!     ApplyOutcome::ResyncRequired { last: 1, got: 1 }
//! ));
//!
//! let rows = DepthViewBuilder::new(11).build(book.bids());
//! assert_eq!(rows[1].total, "3.0000");
//! ```

pub mod depth;
pub mod engine;
pub mod handle;
pub mod ladder;

pub use depth::{DepthViewBuilder, DisplayRow};
pub use engine::{ApplyOutcome, ReconciliationState};
pub use handle::{BookHandle, DepthSnapshot};
pub use ladder::{LevelChange, LevelLadder, RestingLevel};
