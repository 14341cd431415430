//! Shared data structures for calibration forecasting
//!
//! - Calibration events and per-instrument static attributes
//! - The fixed feature schema, raw feature maps, sanitized vectors and batch frames
//! - Prediction results, reconstruction traces and the per-instrument forecast shape
//! - Fleet-wide aggregation and dashboard reports

mod event;
mod features;
mod prediction;
mod report;

pub use event::*;
pub use features::*;
pub use prediction::*;
pub use report::*;
