//! Engine Configuration Module
//!
//! Forecasting policy constants (feature fallbacks, prediction floors,
//! replay fallbacks, aggregation rules) loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `CALIBRATION_FORECAST_CONFIG` environment variable (path to TOML file)
//! 2. `calibration_forecast.toml` in the current working directory
//! 3. Built-in defaults (see `defaults`)
//!
//! ## Usage
//!
//! The configuration is an ordinary value passed to the components that
//! need it; there is no process-wide instance.
//!
//! ```ignore
//! let config = EngineConfig::load();
//! let oracle = PredictionOracle::new(bundle, &config.oracle);
//! let engine = HistoryReplayEngine::new(&oracle, &config);
//! ```

mod engine_config;
pub mod defaults;
pub mod validation;

pub use engine_config::*;
