//! Feature derivation and sanitization
//!
//! - `builder`: calibration event → raw feature map (the only place the formulas live)
//! - `sanitizer`: raw feature map → complete, finite, schema-ordered vector

pub mod builder;
pub mod sanitizer;

pub use builder::{set_calibration_count, FeatureVectorBuilder};
pub use sanitizer::{coerce, sanitize};
