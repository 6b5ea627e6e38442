//! Schema-directed data extraction
//!
//! Melts walk events into insert statements. A [`MeltPlan`] is computed once
//! from the loaded schema; the [`PlannedMelter`] then collects the declared
//! cells of each matching element into a [`Row`](crate::types::Row) and the
//! [`InsertWriter`] streams the statements out in document start order.

pub mod extractor;
pub mod plan;
pub mod writer;

pub use extractor::{MeltStats, PlannedMelter, DEFAULT_SPILL_LIMIT};
pub use plan::{MeltPlan, TablePlan};
pub use writer::{InsertWriter, SpillBuffer};
