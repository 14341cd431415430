//! Calibration events and the slowly-varying instrument attributes derived from them

use serde::{Deserialize, Serialize};

use crate::temporal::Timestamp;

// ============================================================================
// Calibration Event
// ============================================================================

/// One historical calibration record for a physical instrument.
///
/// Constructed at the persistence boundary (see `store::CalibrationRecord`)
/// and read-only from then on: the engine derives ephemeral feature vectors
/// from events but never mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEvent {
    /// Instrument identifier; groups events into one history
    pub instrument_code: String,
    /// When the calibration took place
    pub timestamp: Timestamp,
    /// Ambient temperature during calibration (°C)
    pub temperature: Option<f64>,
    /// Relative humidity during calibration (%)
    pub humidity: Option<f64>,
    /// Reported measurement uncertainty
    pub uncertainty: Option<f64>,
    /// Categorical brand identifier
    pub brand_id: Option<f64>,
    /// Catalog recalibration interval (days)
    pub nominal_interval_days: Option<f64>,
    /// Free-text instrument type label (normalized only for reporting)
    pub instrument_type: String,
    /// Presentation-only descriptors echoed back to consumers
    #[serde(default)]
    pub descriptor: InstrumentDescriptor,
}

/// Descriptive fields that never feed the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentDescriptor {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub range: Option<String>,
    pub unit: Option<String>,
}

/// Stable ascending sort by timestamp; events with equal timestamps keep
/// their input order.
pub fn sort_chronologically(events: &mut [CalibrationEvent]) {
    events.sort_by_key(|e| e.timestamp);
}

// ============================================================================
// Static Attributes
// ============================================================================

/// Attributes of the instrument rather than of a single calibration.
///
/// Built by carrying forward the most recent non-missing value of each
/// attribute along a chronological walk, so the attributes "as of" event `i`
/// never depend on events after `i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticAttributes {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub uncertainty: Option<f64>,
    pub brand_id: Option<f64>,
    pub nominal_interval_days: Option<f64>,
}

impl StaticAttributes {
    /// Latest known attributes over a chronologically sorted slice.
    pub fn as_of(history: &[CalibrationEvent]) -> Self {
        let mut attrs = Self::default();
        for event in history {
            attrs.absorb(event);
        }
        attrs
    }

    /// Overwrite each attribute the event actually reports.
    pub fn absorb(&mut self, event: &CalibrationEvent) {
        fn keep(slot: &mut Option<f64>, value: Option<f64>) {
            if let Some(v) = value.filter(|v| v.is_finite()) {
                *slot = Some(v);
            }
        }
        keep(&mut self.temperature, event.temperature);
        keep(&mut self.humidity, event.humidity);
        keep(&mut self.uncertainty, event.uncertainty);
        keep(&mut self.brand_id, event.brand_id);
        keep(&mut self.nominal_interval_days, event.nominal_interval_days);
    }
}
