//! System-wide default constants.
//!
//! Every value here is the built-in default of a field in `EngineConfig`.
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Feature Derivation
// ============================================================================

/// Temperature (°C) used when neither the event nor the instrument reports one.
pub const DEFAULT_TEMPERATURE_C: f64 = 20.0;

/// Relative humidity (%) used when neither the event nor the instrument reports one.
pub const DEFAULT_HUMIDITY_PCT: f64 = 50.0;

/// Smallest inter-calibration gap (days) considered plausible.
pub const MIN_PLAUSIBLE_GAP_DAYS: i64 = 1;

/// Largest inter-calibration gap (days) considered plausible. 3 650 ≈ 10 years.
pub const MAX_PLAUSIBLE_GAP_DAYS: i64 = 3_650;

// ============================================================================
// Current-State Extraction
// ============================================================================

/// Temperature (°C) assumed for the forward prediction when no event reports one.
pub const CURRENT_STATE_TEMPERATURE_C: f64 = 22.0;

/// Humidity (%) assumed for the forward prediction when no event reports one.
pub const CURRENT_STATE_HUMIDITY_PCT: f64 = 60.0;

// ============================================================================
// Prediction Oracle
// ============================================================================

/// Minimum days returned by a single-vector prediction.
pub const SINGLE_MIN_DAYS: u32 = 1;

/// Minimum days returned by batch (reporting) predictions.
///
/// Deliberately higher than the single-item floor.
pub const BATCH_MIN_DAYS: u32 = 30;

/// R² reported when the model bundle carries no metrics.
pub const DEFAULT_MODEL_R2: f64 = 0.94;

// ============================================================================
// History Replay
// ============================================================================

/// Substitute for a failed replay step when no valid prediction precedes it.
pub const REPLAY_FALLBACK_DAYS: u32 = 30;

// ============================================================================
// Bulk Aggregation
// ============================================================================

/// Standard interval when neither catalog nor history gives a usable value.
pub const DEFAULT_STD_INTERVAL_DAYS: u32 = 180;

/// Catalog/historical medians at or below this are not meaningful intervals.
pub const MIN_MEANINGFUL_INTERVAL_DAYS: f64 = 30.0;

/// Heuristic extension of the standard interval when no model is available.
pub const HEURISTIC_EXTENSION_FACTOR: f64 = 1.1;

/// Label used for events with an empty instrument type.
pub const UNKNOWN_TYPE_LABEL: &str = "Sin Clasificar";

// ============================================================================
// Persistence
// ============================================================================

/// Page size for bulk retrieval from a calibration store.
pub const STORE_PAGE_SIZE: usize = 1_000;
