//! Regression model collaborator
//!
//! The model is an opaque numeric function over a fixed-order feature row.
//! `ModelBundle` pairs it with its feature schema and training metrics as one
//! immutable value, constructed at startup and injected into the oracle.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::defaults::DEFAULT_MODEL_R2;
use crate::error::ForecastError;
use crate::types::default_feature_names;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("{0}")]
    Failed(String),
}

/// A trained regression function.
///
/// Implementations must be safe for concurrent read-only invocation; a model
/// with per-call mutable state must be serialized by its owner.
pub trait RegressionModel: Send + Sync {
    fn predict(&self, row: &[f64]) -> Result<f64, ModelError>;

    /// Vectorized prediction; the default applies `predict` row by row.
    fn predict_many(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Expected row width, when the model knows it.
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// Per-feature importances in schema order, for reporting only.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

// ============================================================================
// Linear Model
// ============================================================================

/// `y = intercept + Σ coefficients[i] · x[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importances: Option<Vec<f64>>,
}

impl RegressionModel for LinearModel {
    fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: row.len(),
            });
        }
        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.importances.clone()
    }
}

/// Adapts a plain closure into a `RegressionModel`.
pub struct FnModel<F>(pub F);

impl<F> RegressionModel for FnModel<F>
where
    F: Fn(&[f64]) -> Result<f64, ModelError> + Send + Sync,
{
    fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        (self.0)(row)
    }
}

// ============================================================================
// Model Bundle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub r2: f64,
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self { r2: DEFAULT_MODEL_R2 }
    }
}

impl ModelMetrics {
    /// A wrapped bundle that ships no metrics reports no fit at all.
    pub const UNREPORTED: Self = Self { r2: 0.0 };
}

/// Model + feature schema + metrics, immutable once built.
#[derive(Clone)]
pub struct ModelBundle {
    model: Arc<dyn RegressionModel>,
    feature_names: Vec<String>,
    metrics: ModelMetrics,
}

impl std::fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBundle")
            .field("feature_names", &self.feature_names)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

/// On-disk bundle: either `{ model, feature_cols?, metrics? }` or a bare model.
#[derive(Deserialize)]
#[serde(untagged)]
enum BundleFile {
    Wrapped {
        model: ModelSpec,
        #[serde(default)]
        feature_cols: Option<Vec<String>>,
        #[serde(default)]
        metrics: Option<ModelMetrics>,
    },
    Bare(ModelSpec),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ModelSpec {
    Linear(LinearModel),
}

impl ModelSpec {
    fn into_model(self) -> Arc<dyn RegressionModel> {
        match self {
            Self::Linear(m) => Arc::new(m),
        }
    }
}

impl ModelBundle {
    /// Bundle a model with an explicit schema.
    ///
    /// Rejects an empty schema and a schema whose width disagrees with the
    /// model's own.
    pub fn new(
        model: Arc<dyn RegressionModel>,
        feature_names: Vec<String>,
        metrics: ModelMetrics,
    ) -> Result<Self, ForecastError> {
        if feature_names.is_empty() {
            return Err(ForecastError::OracleUnavailable(
                "model bundle has an empty feature schema".to_string(),
            ));
        }
        if let Some(n) = model.n_features() {
            if n != feature_names.len() {
                return Err(ForecastError::OracleUnavailable(format!(
                    "model expects {n} features but schema lists {}",
                    feature_names.len()
                )));
            }
        }
        Ok(Self {
            model,
            feature_names,
            metrics,
        })
    }

    /// Bundle a model with the standard feature schema.
    pub fn with_default_schema(model: Arc<dyn RegressionModel>) -> Result<Self, ForecastError> {
        Self::new(model, default_feature_names(), ModelMetrics::default())
    }

    /// Parse a JSON bundle. Missing `feature_cols` falls back to the
    /// standard schema. A wrapped bundle without metrics reports R² = 0,
    /// a bare model gets the default R².
    pub fn from_json_str(json: &str) -> Result<Self, ForecastError> {
        let file: BundleFile = serde_json::from_str(json)
            .map_err(|e| ForecastError::OracleUnavailable(format!("invalid model bundle: {e}")))?;
        match file {
            BundleFile::Wrapped {
                model,
                feature_cols,
                metrics,
            } => Self::new(
                model.into_model(),
                feature_cols.unwrap_or_else(default_feature_names),
                metrics.unwrap_or(ModelMetrics::UNREPORTED),
            ),
            BundleFile::Bare(model) => Self::with_default_schema(model.into_model()),
        }
    }

    /// Load a JSON bundle from disk; any failure means the oracle is unavailable.
    pub fn load_json(path: &Path) -> Result<Self, ForecastError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::OracleUnavailable(format!(
                "cannot read model bundle {}: {e}",
                path.display()
            ))
        })?;
        let bundle = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            features = bundle.feature_names.len(),
            r2 = bundle.metrics.r2,
            "Model bundle loaded"
        );
        Ok(bundle)
    }

    pub fn model(&self) -> &dyn RegressionModel {
        self.model.as_ref()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn metrics(&self) -> ModelMetrics {
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_predict() {
        let m = LinearModel {
            intercept: 10.0,
            coefficients: vec![1.0, 2.0],
            importances: None,
        };
        assert!((m.predict(&[3.0, 4.0]).expect("ok") - 21.0).abs() < 1e-12);
        assert_eq!(
            m.predict(&[1.0]),
            Err(ModelError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_bundle_wrapped_json() {
        let bundle = ModelBundle::from_json_str(
            r#"{
                "model": {"type": "linear", "intercept": 1.0, "coefficients": [0.5, 0.5]},
                "feature_cols": ["temperatura", "humedad"],
                "metrics": {"r2": 0.81}
            }"#,
        )
        .expect("valid bundle");
        assert_eq!(bundle.feature_names(), &["temperatura", "humedad"]);
        assert!((bundle.metrics().r2 - 0.81).abs() < 1e-12);
    }

    #[test]
    fn test_bundle_wrapped_json_without_metrics_reports_zero_r2() {
        let bundle = ModelBundle::from_json_str(
            r#"{"model": {"type": "linear", "intercept": 0.0, "coefficients": [0,0,0,0,0,0,0,0]}}"#,
        )
        .expect("valid bundle");
        assert_eq!(bundle.feature_names().len(), 8);
        assert!(bundle.metrics().r2.abs() < f64::EPSILON);
    }

    #[test]
    fn test_bundle_bare_json_uses_default_schema() {
        let bundle = ModelBundle::from_json_str(
            r#"{"type": "linear", "intercept": 0.0, "coefficients": [0,0,0,0,0,0,0,0]}"#,
        )
        .expect("valid bundle");
        assert_eq!(bundle.feature_names().len(), 8);
        assert!((bundle.metrics().r2 - DEFAULT_MODEL_R2).abs() < 1e-12);
    }

    #[test]
    fn test_bundle_rejects_width_mismatch() {
        let err = ModelBundle::from_json_str(
            r#"{"type": "linear", "intercept": 0.0, "coefficients": [1.0]}"#,
        )
        .expect_err("width mismatch");
        assert!(matches!(err, ForecastError::OracleUnavailable(_)));
    }

    #[test]
    fn test_load_missing_file_is_unavailable() {
        let err = ModelBundle::load_json(Path::new("/nonexistent/model.json"))
            .expect_err("missing file");
        assert!(matches!(err, ForecastError::OracleUnavailable(_)));
    }
}
