//! Fleet-wide aggregation
//!
//! - `table`: grouped, ordered, columnar event features
//! - `normalize`: instrument-type label cleanup
//! - `aggregate`: per-type intervals and the dashboard report

pub mod aggregate;
pub mod normalize;
pub mod table;

pub use aggregate::{monthly_histogram, AggregationOutcome, BulkAggregator};
pub use normalize::{title_case, TypeNormalizer};
pub use table::EventTable;
