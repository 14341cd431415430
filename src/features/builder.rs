//! Feature Vector Builder
//!
//! The single place where calibration events become model features. Forward
//! prediction, historical replay and bulk aggregation all route through
//! `FeatureVectorBuilder::build`, so the formulas cannot drift apart.
//!
//! ## Leak-freedom
//! `build` reads only the event itself, its immediate predecessor, the static
//! attributes known at that point, and a fixed anchor. The anchor is the
//! first event of the *full* history and is chosen once by the caller; a
//! per-sublist anchor would silently change the meaning of `edad_operacional`.

use crate::config::{CurrentStateConfig, FeatureConfig};
use crate::temporal::{days_between, month_of, months_since, Timestamp};
use crate::types::{
    CalibrationEvent, RawFeatures, RawValue, StaticAttributes, DIAS_DESDE_PREV,
    EDAD_OPERACIONAL, HUMEDAD, INCERTIDUMBRE, MARCA_ID, MES, NUM_CALIBRACIONES, TEMPERATURA,
};

/// Derives raw feature maps from calibration events.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder {
    default_temperature: f64,
    default_humidity: f64,
}

impl FeatureVectorBuilder {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            default_temperature: config.default_temperature,
            default_humidity: config.default_humidity,
        }
    }

    /// Build the raw features for `event`.
    ///
    /// Returns the feature map and the event timestamp. `num_calibraciones`
    /// is left unset: it is an accumulation over the caller's walk.
    /// Implausible gaps are passed through; flagging them is caller policy.
    pub fn build(
        &self,
        event: &CalibrationEvent,
        predecessor: Option<&CalibrationEvent>,
        statics: &StaticAttributes,
        anchor: &Timestamp,
    ) -> (RawFeatures, Timestamp) {
        let ts = event.timestamp;
        let gap = days_between(predecessor.map(|p| &p.timestamp), &ts);

        let temperature = event
            .temperature
            .or(statics.temperature)
            .unwrap_or(self.default_temperature);
        let humidity = event
            .humidity
            .or(statics.humidity)
            .unwrap_or(self.default_humidity);

        let mut raw = RawFeatures::new();
        raw.insert(INCERTIDUMBRE.to_string(), statics.uncertainty.unwrap_or(0.0).into());
        raw.insert(TEMPERATURA.to_string(), temperature.into());
        raw.insert(HUMEDAD.to_string(), humidity.into());
        raw.insert(MARCA_ID.to_string(), statics.brand_id.unwrap_or(0.0).into());
        raw.insert(EDAD_OPERACIONAL.to_string(), months_since(anchor, &ts).into());
        raw.insert(DIAS_DESDE_PREV.to_string(), gap.into());
        raw.insert(MES.to_string(), month_of(&ts).into());

        (raw, ts)
    }

    /// Features for the forward (current-state) prediction.
    ///
    /// `history` must be sorted ascending and non-empty. Climate values fall
    /// back to the current-state defaults when no event ever reported them.
    pub fn build_current_state(
        &self,
        history: &[CalibrationEvent],
        current: &CurrentStateConfig,
    ) -> Option<(RawFeatures, Timestamp)> {
        let (latest, earlier) = history.split_last()?;
        let anchor = history.first().map(|e| e.timestamp)?;

        let mut statics = StaticAttributes::as_of(history);
        statics.temperature = statics.temperature.or(Some(current.default_temperature));
        statics.humidity = statics.humidity.or(Some(current.default_humidity));

        let (mut raw, ts) = self.build(latest, earlier.last(), &statics, &anchor);
        set_calibration_count(&mut raw, history.len());
        Some((raw, ts))
    }
}

/// Record the 1-based number of calibrations observed so far.
pub fn set_calibration_count(raw: &mut RawFeatures, count: usize) {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    raw.insert(NUM_CALIBRACIONES.to_string(), RawValue::from(count));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::parse_timestamp;
    use crate::types::InstrumentDescriptor;
    use chrono::Duration;

    fn event_at(ts: Timestamp) -> CalibrationEvent {
        CalibrationEvent {
            instrument_code: "MN-104".to_string(),
            timestamp: ts,
            temperature: None,
            humidity: None,
            uncertainty: None,
            brand_id: None,
            nominal_interval_days: None,
            instrument_type: "Manómetro".to_string(),
            descriptor: InstrumentDescriptor::default(),
        }
    }

    fn num(raw: &RawFeatures, key: &str) -> f64 {
        match raw.get(key) {
            Some(RawValue::Number(v)) => *v,
            other => panic!("{key} missing or non-numeric: {other:?}"),
        }
    }

    fn builder() -> FeatureVectorBuilder {
        FeatureVectorBuilder::new(&FeatureConfig::default())
    }

    #[test]
    fn test_first_event_has_zero_age_and_gap() {
        let t0 = parse_timestamp("2021-03-10T09:00:00Z").expect("valid");
        let e0 = event_at(t0);
        let (raw, ts) = builder().build(&e0, None, &StaticAttributes::default(), &t0);

        assert_eq!(ts, t0);
        assert!(num(&raw, EDAD_OPERACIONAL).abs() < f64::EPSILON);
        assert!(num(&raw, DIAS_DESDE_PREV).abs() < f64::EPSILON);
        assert!((num(&raw, MES) - 3.0).abs() < f64::EPSILON);
        assert!(!raw.contains_key(NUM_CALIBRACIONES));
    }

    #[test]
    fn test_gap_and_age_from_anchor() {
        let t0 = parse_timestamp("2020-01-01T00:00:00Z").expect("valid");
        let e1 = event_at(t0 + Duration::days(100));
        let e2 = event_at(t0 + Duration::days(220));
        let statics = StaticAttributes::default();

        let (raw, _) = builder().build(&e2, Some(&e1), &statics, &t0);
        assert!((num(&raw, DIAS_DESDE_PREV) - 120.0).abs() < f64::EPSILON);
        assert!((num(&raw, EDAD_OPERACIONAL) - 7.2).abs() < 1e-9);
    }

    #[test]
    fn test_climate_fallback_chain() {
        let t0 = parse_timestamp("2020-01-01").expect("valid");
        let mut e = event_at(t0);
        let b = builder();

        // literal constants
        let (raw, _) = b.build(&e, None, &StaticAttributes::default(), &t0);
        assert!((num(&raw, TEMPERATURA) - 20.0).abs() < f64::EPSILON);
        assert!((num(&raw, HUMEDAD) - 50.0).abs() < f64::EPSILON);

        // static defaults
        let statics = StaticAttributes {
            temperature: Some(18.5),
            humidity: Some(40.0),
            ..Default::default()
        };
        let (raw, _) = b.build(&e, None, &statics, &t0);
        assert!((num(&raw, TEMPERATURA) - 18.5).abs() < f64::EPSILON);

        // event values win
        e.temperature = Some(23.0);
        let (raw, _) = b.build(&e, None, &statics, &t0);
        assert!((num(&raw, TEMPERATURA) - 23.0).abs() < f64::EPSILON);
        assert!((num(&raw, HUMEDAD) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_instrument_attributes_come_from_statics() {
        let t0 = parse_timestamp("2020-01-01").expect("valid");
        let mut e = event_at(t0);
        e.uncertainty = Some(9.9);
        e.brand_id = Some(9.0);

        let (raw, _) = builder().build(&e, None, &StaticAttributes::default(), &t0);
        assert!(num(&raw, INCERTIDUMBRE).abs() < f64::EPSILON);
        assert!(num(&raw, MARCA_ID).abs() < f64::EPSILON);

        let statics = StaticAttributes {
            uncertainty: Some(0.1),
            brand_id: Some(3.0),
            ..Default::default()
        };
        let (raw, _) = builder().build(&e, None, &statics, &t0);
        assert!((num(&raw, INCERTIDUMBRE) - 0.1).abs() < f64::EPSILON);
        assert!((num(&raw, MARCA_ID) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_current_state_uses_full_history() {
        let t0 = parse_timestamp("2020-01-01T00:00:00Z").expect("valid");
        let history = vec![
            event_at(t0),
            event_at(t0 + Duration::days(100)),
            event_at(t0 + Duration::days(220)),
        ];

        let (raw, ts) = builder()
            .build_current_state(&history, &CurrentStateConfig::default())
            .expect("non-empty history");

        assert_eq!(ts, t0 + Duration::days(220));
        assert!((num(&raw, NUM_CALIBRACIONES) - 3.0).abs() < f64::EPSILON);
        assert!((num(&raw, DIAS_DESDE_PREV) - 120.0).abs() < f64::EPSILON);
        assert!((num(&raw, TEMPERATURA) - 22.0).abs() < f64::EPSILON);
        assert!((num(&raw, HUMEDAD) - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_current_state_empty_history() {
        assert!(builder()
            .build_current_state(&[], &CurrentStateConfig::default())
            .is_none());
    }
}
