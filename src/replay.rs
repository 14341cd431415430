//! History Replay Engine
//!
//! For one instrument:
//! 1. Sorts a private copy of the history (stable for equal timestamps)
//! 2. Fixes the anchor at the first event
//! 3. Computes the forward prediction from the current state (fatal on failure)
//! 4. Walks the history and reconstructs what the model would have predicted
//!    at every point, using only events up to that point
//!
//! Per-step failures in the walk are replaced by a fallback value and
//! counted in `ReplayDiagnostics`; they never abort the replay.

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::config::{CurrentStateConfig, EngineConfig, FeatureConfig};
use crate::error::ForecastError;
use crate::features::{set_calibration_count, FeatureVectorBuilder};
use crate::oracle::PredictionOracle;
use crate::temporal::{days_between, now, Timestamp};
use crate::types::{
    sort_chronologically, CalibrationEvent, FeatureVector, ForwardPrediction, PredictionResult,
    ReconstructionTrace, ReplayDiagnostics, StaticAttributes, TracePoint,
};

/// Everything a replay produces for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    /// The input history, sorted ascending
    pub history: Vec<CalibrationEvent>,
    pub forward: ForwardPrediction,
    /// Sanitized current-state vector behind `forward`
    pub current_features: FeatureVector,
    /// Exactly one point per history event
    pub trace: ReconstructionTrace,
    pub diagnostics: ReplayDiagnostics,
}

pub struct HistoryReplayEngine<'a> {
    oracle: &'a PredictionOracle,
    builder: FeatureVectorBuilder,
    features: FeatureConfig,
    current_state: CurrentStateConfig,
    fallback_days: u32,
}

impl<'a> HistoryReplayEngine<'a> {
    pub fn new(oracle: &'a PredictionOracle, config: &EngineConfig) -> Self {
        Self {
            oracle,
            builder: FeatureVectorBuilder::new(&config.features),
            features: config.features.clone(),
            current_state: config.current_state.clone(),
            fallback_days: config.replay.fallback_days,
        }
    }

    /// Full replay of one instrument's events.
    ///
    /// Fails only when the history is empty or the forward prediction fails.
    pub fn replay(&self, events: &[CalibrationEvent]) -> Result<ReplayOutcome, ForecastError> {
        let mut history = events.to_vec();
        sort_chronologically(&mut history);

        let (current_features, forward) = self.forward(&history)?;
        let (trace, diagnostics) = self.reconstruct(&history);

        info!(
            instrument = history.last().map_or("", |e| e.instrument_code.as_str()),
            events = history.len(),
            forward_days = forward.result.days,
            fallback_steps = diagnostics.fallback_steps,
            implausible_gaps = diagnostics.implausible_gaps,
            "Replay complete"
        );

        Ok(ReplayOutcome {
            history,
            forward,
            current_features,
            trace,
            diagnostics,
        })
    }

    /// Current-state prediction from a sorted history.
    ///
    /// No fallback: a user-facing estimate is either a real model output or
    /// an error.
    pub fn forward(
        &self,
        history: &[CalibrationEvent],
    ) -> Result<(FeatureVector, ForwardPrediction), ForecastError> {
        let (raw, latest) = self
            .builder
            .build_current_state(history, &self.current_state)
            .ok_or_else(|| ForecastError::MissingData("empty calibration history".to_string()))?;
        let features = self.oracle.sanitize(&raw);
        let result = self.oracle.predict_vector(&features)?;
        let estimated_next = estimate_next(&latest, result);
        Ok((
            features,
            ForwardPrediction {
                result,
                estimated_next,
            },
        ))
    }

    /// Per-point reconstruction over a sorted history.
    ///
    /// `trace[0]` is always the origin. Step `i` reads only `history[..=i]`
    /// and the fixed anchor, so replaying a prefix reproduces the prefix of
    /// the full trace.
    pub fn reconstruct(&self, history: &[CalibrationEvent]) -> (ReconstructionTrace, ReplayDiagnostics) {
        let mut trace = ReconstructionTrace::with_capacity(history.len());
        let mut diagnostics = ReplayDiagnostics::default();
        let Some(first) = history.first() else {
            return (trace, diagnostics);
        };
        let anchor = first.timestamp;

        let mut statics = StaticAttributes::default();
        statics.absorb(first);
        trace.push(TracePoint::Origin);

        for (i, pair) in history.windows(2).enumerate() {
            let step = i + 1;
            let (previous, event) = (&pair[0], &pair[1]);
            statics.absorb(event);

            let gap = days_between(Some(&previous.timestamp), &event.timestamp);
            if !self.features.is_plausible_gap(gap) {
                diagnostics.implausible_gaps += 1;
                debug!(
                    instrument = %event.instrument_code,
                    step,
                    gap_days = gap,
                    "Implausible gap between calibrations"
                );
            }

            let (mut raw, _) = self.builder.build(event, Some(previous), &statics, &anchor);
            set_calibration_count(&mut raw, step + 1);

            match self.oracle.predict_single(&raw) {
                Ok(result) => trace.push(TracePoint::Predicted(result.days)),
                Err(e) => {
                    let fallback_days = self.fallback_for(&trace);
                    warn!(
                        instrument = %event.instrument_code,
                        step,
                        fallback_days,
                        error = %e,
                        "Replay step failed, substituting fallback"
                    );
                    trace.push(TracePoint::Fallback(fallback_days));
                    diagnostics.fallback_steps += 1;
                    diagnostics.fallback_indices.push(step);
                }
            }
        }

        (trace, diagnostics)
    }

    /// Floor of the mean of every positive trace value so far, else the
    /// default. Earlier fallbacks count like model outputs.
    fn fallback_for(&self, trace: &ReconstructionTrace) -> u32 {
        let (sum, count) = trace
            .positive_days()
            .fold((0u64, 0u64), |(s, c), d| (s + u64::from(d), c + 1));
        if count == 0 {
            return self.fallback_days;
        }
        u32::try_from(sum / count).unwrap_or(u32::MAX)
    }
}

/// Latest timestamp plus the predicted days, or now plus the days if that
/// instant is out of range.
fn estimate_next(latest: &Timestamp, result: PredictionResult) -> Timestamp {
    let span = Duration::days(i64::from(result.days));
    latest.checked_add_signed(span).unwrap_or_else(|| {
        warn!(latest = %latest, days = result.days, "Estimated date out of range, anchoring at now");
        now() + span
    })
}
