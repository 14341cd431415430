//! Prediction results, reconstruction traces and the consumer-facing forecast shape

use serde::{Deserialize, Serialize};

use crate::temporal::{round1, Timestamp, DAYS_PER_MONTH};

use super::{CalibrationEvent, FeatureVector};

// ============================================================================
// Prediction Result
// ============================================================================

/// Post-processed output of a single model invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Days until the next calibration, never below the single-item floor
    pub days: u32,
    /// `days / 30.44`, rounded to one decimal
    pub months: f64,
}

impl PredictionResult {
    pub fn from_days(days: u32) -> Self {
        Self {
            days,
            months: round1(f64::from(days) / DAYS_PER_MONTH),
        }
    }

    /// Whole weeks, with ties going to the even neighbour.
    pub fn weeks(&self) -> f64 {
        (f64::from(self.days) / 7.0).round_ties_even()
    }
}

// ============================================================================
// Reconstruction Trace
// ============================================================================

/// One entry of a historical replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum TracePoint {
    /// The anchor event; no prediction precedes the first observation
    Origin,
    /// The model produced a valid prediction at this point
    Predicted(u32),
    /// The step failed and a substitute value was used
    Fallback(u32),
}

impl TracePoint {
    pub fn days(self) -> u32 {
        match self {
            Self::Origin => 0,
            Self::Predicted(d) | Self::Fallback(d) => d,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// "What would have been predicted" at every point of an instrument's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructionTrace {
    points: Vec<TracePoint>,
}

impl ReconstructionTrace {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            points: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, point: TracePoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Plain day values, with the origin as 0 and fallbacks inlined.
    pub fn to_days(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.days()).collect()
    }

    /// Every positive day value so far, substituted fallbacks included.
    pub fn positive_days(&self) -> impl Iterator<Item = u32> + '_ {
        self.points.iter().map(|p| p.days()).filter(|d| *d > 0)
    }
}

/// Failure counters accumulated during a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayDiagnostics {
    /// Number of history points that used a substitute value
    pub fallback_steps: usize,
    /// Indices (into the sorted history) of those points
    pub fallback_indices: Vec<usize>,
    /// Steps whose gap from the predecessor fell outside the plausible range
    pub implausible_gaps: usize,
}

/// Forward (next-calibration) prediction anchored to the latest event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardPrediction {
    pub result: PredictionResult,
    pub estimated_next: Timestamp,
}

// ============================================================================
// Consumer-facing Forecast
// ============================================================================

const NOT_AVAILABLE: &str = "N/A";

/// Latest-event summary echoed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentSummary {
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "tipo")]
    pub category: String,
    #[serde(rename = "marca")]
    pub brand: String,
    #[serde(rename = "rango")]
    pub range: String,
    #[serde(rename = "unidad")]
    pub unit: String,
    #[serde(rename = "fecha_calibracion")]
    pub calibrated_at: String,
    #[serde(rename = "temperatura")]
    pub temperature: Option<f64>,
    #[serde(rename = "humedad")]
    pub humidity: Option<f64>,
}

impl InstrumentSummary {
    pub fn from_event(event: &CalibrationEvent) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            code: event.instrument_code.clone(),
            category: text(&event.descriptor.category),
            brand: text(&event.descriptor.brand),
            range: text(&event.descriptor.range),
            unit: text(&event.descriptor.unit),
            calibrated_at: event.timestamp.to_rfc3339(),
            temperature: event.temperature,
            humidity: event.humidity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardPredictionView {
    #[serde(rename = "dias_hasta_siguiente")]
    pub days_until_next: u32,
    #[serde(rename = "meses_aproximados")]
    pub approx_months: f64,
    #[serde(rename = "semanas_aproximadas")]
    pub approx_weeks: f64,
    #[serde(rename = "fecha_estimada")]
    pub estimated_date: String,
}

impl From<&ForwardPrediction> for ForwardPredictionView {
    fn from(forward: &ForwardPrediction) -> Self {
        Self {
            days_until_next: forward.result.days,
            approx_months: forward.result.months,
            approx_weeks: forward.result.weeks(),
            estimated_date: forward.estimated_next.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntryView {
    #[serde(rename = "fecha_calibracion")]
    pub calibrated_at: String,
    #[serde(rename = "codigo")]
    pub code: String,
}

/// Full per-instrument response: forward estimate, history and replay trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentForecast {
    #[serde(rename = "instrumento")]
    pub instrument: InstrumentSummary,
    #[serde(rename = "prediccion")]
    pub prediction: ForwardPredictionView,
    #[serde(rename = "historial")]
    pub history: Vec<HistoryEntryView>,
    #[serde(rename = "predicciones_historicas")]
    pub historical_predictions: Vec<u32>,
    pub features: FeatureVector,
    #[serde(rename = "diagnosticos")]
    pub diagnostics: ReplayDiagnostics,
}

/// Response of a direct single-vector prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectPrediction {
    #[serde(rename = "dias_hasta_siguiente")]
    pub days_until_next: u32,
    #[serde(rename = "meses_aproximados")]
    pub approx_months: f64,
}

impl From<PredictionResult> for DirectPrediction {
    fn from(result: PredictionResult) -> Self {
        Self {
            days_until_next: result.days,
            approx_months: result.months,
        }
    }
}
