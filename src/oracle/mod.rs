//! Prediction oracle
//!
//! - `model`: the regression collaborator and its immutable bundle
//! - `adapter`: sanitize → invoke → validate → round/floor
//! - `importance`: reporting-only feature importances

pub mod adapter;
pub mod importance;
pub mod model;

pub use adapter::PredictionOracle;
pub use importance::feature_importance_list;
pub use model::{FnModel, LinearModel, ModelBundle, ModelError, ModelMetrics, RegressionModel};
