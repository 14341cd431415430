//! Calibration interval forecasting
//!
//! Predicts when a measurement instrument should next be calibrated and
//! reconstructs, for every point of its history, what a model would have
//! predicted at that time.
//!
//! ## Architecture
//!
//! - **Feature Builder**: the single event → feature derivation (leak-free, fixed anchor)
//! - **Sanitizer**: total conversion of raw maps into finite, ordered vectors
//! - **Prediction Oracle**: injected regression model plus output policy
//! - **Replay Engine**: forward estimate and per-point reconstruction trace
//! - **Bulk Aggregator**: fleet-wide per-type intervals and dashboard report
//! - **Store**: persistence collaborator (in-memory, sled, JSON files)

pub mod bulk;
pub mod config;
pub mod error;
pub mod features;
pub mod oracle;
pub mod replay;
pub mod service;
pub mod store;
pub mod temporal;
pub mod types;

// Re-export configuration
pub use config::EngineConfig;

// Re-export errors
pub use error::{ErrorKind, ForecastError};

// Re-export commonly used types
pub use types::{
    AggregateTypeSummary, CalibrationEvent, DashboardReport, FeatureVector, InstrumentForecast,
    PredictionResult, RawFeatures, RawValue, ReconstructionTrace, ReplayDiagnostics,
    StaticAttributes, TracePoint, FEATURE_COLUMNS,
};

// Re-export engines
pub use bulk::BulkAggregator;
pub use features::FeatureVectorBuilder;
pub use oracle::{LinearModel, ModelBundle, PredictionOracle, RegressionModel};
pub use replay::{HistoryReplayEngine, ReplayOutcome};
pub use service::CalibrationForecaster;

// Re-export storage
pub use store::{CalibrationStore, MemoryStore, SledStore, StoreError};
