//! Raw persistence records and their validation into `CalibrationEvent`

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::temporal::parse_timestamp;
use crate::types::{CalibrationEvent, InstrumentDescriptor, RawValue};

use super::{normalize_code, StoreError};

/// A calibration row exactly as the persistence layer returns it.
///
/// Numeric columns may arrive as numbers, numeric strings, empty strings or
/// nulls; anything that does not read as a finite number is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    #[serde(rename = "codigo", default)]
    pub code: Option<String>,
    #[serde(rename = "fecha_calibracion", default)]
    pub calibrated_at: Option<String>,
    #[serde(rename = "temperatura", default)]
    pub temperature: Option<RawValue>,
    #[serde(rename = "humedad", default)]
    pub humidity: Option<RawValue>,
    #[serde(rename = "incertidumbre", default)]
    pub uncertainty: Option<RawValue>,
    #[serde(rename = "marca_id", default)]
    pub brand_id: Option<RawValue>,
    #[serde(rename = "periodicidad", default)]
    pub nominal_interval: Option<RawValue>,
    /// Instrument name, used as the type label in fleet reports
    #[serde(rename = "instrumento", default)]
    pub instrument: Option<String>,
    #[serde(rename = "tipo", default)]
    pub category: Option<String>,
    #[serde(rename = "marca", default)]
    pub brand: Option<String>,
    #[serde(rename = "rango", default)]
    pub range: Option<String>,
    #[serde(rename = "unidad", default)]
    pub unit: Option<String>,
}

fn numeric(value: Option<&RawValue>) -> Option<f64> {
    let v = match value? {
        RawValue::Number(n) => *n,
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        RawValue::Bool(_) | RawValue::Null | RawValue::Other(_) => return None,
    };
    v.is_finite().then_some(v)
}

fn text(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl TryFrom<CalibrationRecord> for CalibrationEvent {
    type Error = StoreError;

    fn try_from(record: CalibrationRecord) -> Result<Self, Self::Error> {
        let raw_ts = record
            .calibrated_at
            .as_deref()
            .ok_or_else(|| StoreError::InvalidRecord("missing fecha_calibracion".to_string()))?;
        let timestamp = parse_timestamp(raw_ts)?;

        Ok(CalibrationEvent {
            instrument_code: record.code.as_deref().map(normalize_code).unwrap_or_default(),
            timestamp,
            temperature: numeric(record.temperature.as_ref()),
            humidity: numeric(record.humidity.as_ref()),
            uncertainty: numeric(record.uncertainty.as_ref()),
            brand_id: numeric(record.brand_id.as_ref()),
            nominal_interval_days: numeric(record.nominal_interval.as_ref()),
            instrument_type: text(record.instrument).unwrap_or_default(),
            descriptor: InstrumentDescriptor {
                category: text(record.category),
                brand: text(record.brand),
                range: text(record.range),
                unit: text(record.unit),
            },
        })
    }
}

/// Validate records, dropping (and counting) the ones that cannot become events.
pub fn events_from_records(records: Vec<CalibrationRecord>) -> (Vec<CalibrationEvent>, usize) {
    let mut rejected = 0;
    let events = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match CalibrationEvent::try_from(record) {
            Ok(event) => Some(event),
            Err(e) => {
                rejected += 1;
                warn!(index = i, error = %e, "Rejected calibration record");
                None
            }
        })
        .collect();
    (events, rejected)
}

/// Read a JSON array of calibration records from disk.
pub fn load_events_json(path: &Path) -> Result<Vec<CalibrationEvent>, StoreError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Storage(format!("{}: {e}", path.display())))?;
    let records: Vec<CalibrationRecord> = serde_json::from_str(&contents)?;
    let total = records.len();
    let (events, rejected) = events_from_records(records);
    info!(path = %path.display(), total, rejected, "Calibration records loaded");
    Ok(events)
}
