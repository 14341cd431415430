//! Forecasting service
//!
//! Wires a calibration store, an optional prediction oracle and the engine
//! configuration into the three consumer operations: direct prediction,
//! per-instrument forecast and the fleet dashboard.

use std::sync::Arc;
use tracing::{info, warn};

use crate::bulk::BulkAggregator;
use crate::config::EngineConfig;
use crate::error::ForecastError;
use crate::oracle::{ModelBundle, PredictionOracle};
use crate::replay::HistoryReplayEngine;
use crate::store::{normalize_code, CalibrationStore, StoreError};
use crate::types::{
    DashboardReport, DirectPrediction, ForwardPredictionView, HistoryEntryView,
    InstrumentForecast, InstrumentSummary, RawFeatures,
};

pub struct CalibrationForecaster {
    store: Arc<dyn CalibrationStore>,
    oracle: Option<PredictionOracle>,
    config: EngineConfig,
}

impl CalibrationForecaster {
    pub fn new(
        store: Arc<dyn CalibrationStore>,
        oracle: Option<PredictionOracle>,
        config: EngineConfig,
    ) -> Self {
        info!(
            backend = store.backend_name(),
            model = oracle.is_some(),
            "Forecaster initialized"
        );
        Self {
            store,
            oracle,
            config,
        }
    }

    /// Load the model named by `config.oracle.model_path`, if any.
    ///
    /// A missing or broken model is not fatal here: prediction operations
    /// report `OracleUnavailable`, the dashboard runs in heuristic mode.
    pub fn from_config(store: Arc<dyn CalibrationStore>, config: EngineConfig) -> Self {
        let oracle = config.oracle.model_path.as_deref().and_then(|path| {
            match ModelBundle::load_json(path) {
                Ok(bundle) => Some(PredictionOracle::new(bundle, &config.oracle)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Model unavailable");
                    None
                }
            }
        });
        Self::new(store, oracle, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle(&self) -> Result<&PredictionOracle, ForecastError> {
        self.oracle
            .as_ref()
            .ok_or_else(|| ForecastError::OracleUnavailable("no model loaded".to_string()))
    }

    /// Direct prediction from a caller-supplied feature map.
    pub fn predict(&self, raw: &RawFeatures) -> Result<DirectPrediction, ForecastError> {
        Ok(self.oracle()?.predict_request(raw)?.into())
    }

    /// Forward estimate, history and replay trace for one instrument.
    pub fn forecast(&self, code: &str) -> Result<InstrumentForecast, ForecastError> {
        let oracle = self.oracle()?;
        let code = normalize_code(code);

        let latest = self
            .store
            .latest_event(&code)?
            .ok_or_else(|| StoreError::NotFound(code.clone()))?;
        let events = self.store.full_history(&code)?;

        let outcome = HistoryReplayEngine::new(oracle, &self.config).replay(&events)?;

        Ok(InstrumentForecast {
            instrument: InstrumentSummary::from_event(&latest),
            prediction: ForwardPredictionView::from(&outcome.forward),
            history: outcome
                .history
                .iter()
                .map(|e| HistoryEntryView {
                    calibrated_at: e.timestamp.to_rfc3339(),
                    code: e.instrument_code.clone(),
                })
                .collect(),
            historical_predictions: outcome.trace.to_days(),
            features: outcome.current_features,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Fleet-wide dashboard; runs without a model in heuristic mode.
    pub fn dashboard(&self) -> Result<DashboardReport, ForecastError> {
        let events = self.store.all_events(self.config.store.page_size)?;
        BulkAggregator::new(self.oracle.as_ref(), &self.config).dashboard(events)
    }
}
