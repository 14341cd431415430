//! Prediction Oracle Adapter
//!
//! Wraps a `ModelBundle` and applies the post-processing policy: inputs are
//! sanitized against the bundle's schema, non-finite outputs are rejected,
//! and outputs are rounded and floored (1 day for single vectors, 30 days
//! for batch reporting).

use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::error::ForecastError;
use crate::features::sanitize;
use crate::types::{FeatureFrame, FeatureVector, PredictionResult, RawFeatures};

use super::model::{ModelBundle, ModelMetrics};

/// Model invocation plus output policy.
#[derive(Debug, Clone)]
pub struct PredictionOracle {
    bundle: ModelBundle,
    single_min_days: u32,
    batch_min_days: u32,
}

impl PredictionOracle {
    pub fn new(bundle: ModelBundle, config: &OracleConfig) -> Self {
        Self {
            bundle,
            single_min_days: config.single_min_days,
            batch_min_days: config.batch_min_days,
        }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn feature_names(&self) -> &[String] {
        self.bundle.feature_names()
    }

    pub fn metrics(&self) -> ModelMetrics {
        self.bundle.metrics()
    }

    /// Sanitize a raw map against this oracle's schema.
    pub fn sanitize(&self, raw: &RawFeatures) -> FeatureVector {
        sanitize(raw, self.feature_names())
    }

    /// Predict from an already-sanitized vector.
    ///
    /// A vector built against a different schema is re-aligned by name first.
    pub fn predict_vector(&self, features: &FeatureVector) -> Result<PredictionResult, ForecastError> {
        let aligned;
        let row = if features.names() == self.feature_names() {
            features.as_slice()
        } else {
            let raw: RawFeatures = features
                .iter()
                .map(|(name, value)| (name.to_string(), value.into()))
                .collect();
            aligned = self.sanitize(&raw);
            aligned.as_slice()
        };

        let output = self.bundle.model().predict(row)?;
        if !output.is_finite() {
            warn!(value = output, "Model returned a non-finite prediction");
            return Err(ForecastError::InvalidPrediction { value: output });
        }
        let days = clamp_days(output, self.single_min_days);
        debug!(raw = output, days, "Single prediction");
        Ok(PredictionResult::from_days(days))
    }

    /// Sanitize and predict. Never fails on input shape, only on model output.
    pub fn predict_single(&self, raw: &RawFeatures) -> Result<PredictionResult, ForecastError> {
        self.predict_vector(&self.sanitize(raw))
    }

    /// Direct prediction for an external request.
    ///
    /// Unlike `predict_single`, every schema name must be present as a key
    /// (its value may still be junk and is coerced to 0).
    pub fn predict_request(&self, raw: &RawFeatures) -> Result<PredictionResult, ForecastError> {
        let missing: Vec<&str> = self
            .feature_names()
            .iter()
            .filter(|name| !raw.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::MissingData(format!(
                "missing features: {}",
                missing.join(", ")
            )));
        }
        self.predict_single(raw)
    }

    /// Vectorized prediction over a columnar frame.
    ///
    /// Missing columns are treated as all-zero; the frame itself is never
    /// modified. A single non-finite output fails the whole batch.
    pub fn predict_batch(&self, frame: &FeatureFrame) -> Result<Vec<u32>, ForecastError> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let columns: Vec<Option<&[f64]>> = self
            .feature_names()
            .iter()
            .map(|name| frame.column(name))
            .collect();
        let missing = columns.iter().filter(|c| c.is_none()).count();
        if missing > 0 {
            debug!(missing, "Batch frame lacks schema columns, zero-filling");
        }

        let rows: Vec<Vec<f64>> = (0..frame.len())
            .map(|i| {
                columns
                    .iter()
                    .map(|col| {
                        col.and_then(|c| c.get(i).copied())
                            .filter(|v| v.is_finite())
                            .unwrap_or(0.0)
                    })
                    .collect()
            })
            .collect();

        let outputs = self.bundle.model().predict_many(&rows)?;
        if outputs.len() != rows.len() {
            return Err(ForecastError::OracleUnavailable(format!(
                "model returned {} outputs for {} rows",
                outputs.len(),
                rows.len()
            )));
        }
        if let Some(bad) = outputs.iter().copied().find(|v| !v.is_finite()) {
            warn!(value = bad, rows = rows.len(), "Batch contains a non-finite prediction");
            return Err(ForecastError::InvalidPrediction { value: bad });
        }

        Ok(outputs
            .into_iter()
            .map(|v| clamp_days(v, self.batch_min_days))
            .collect())
    }
}

/// `max(floor, round(value))` for a finite value, with ties going to the
/// even neighbour.
fn clamp_days(value: f64, floor: u32) -> u32 {
    let rounded = value.round_ties_even();
    if rounded <= f64::from(floor) {
        floor
    } else if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        // In range and integral after the checks above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let days = rounded as u32;
        days
    }
}
