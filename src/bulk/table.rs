//! Columnar event table for fleet-wide aggregation
//!
//! Events from many instruments are grouped, ordered per group and run
//! through the same `FeatureVectorBuilder` as replay, then stored column by
//! column so batch prediction and per-type statistics can read them without
//! re-walking histories.

use std::collections::BTreeMap;

use crate::features::{sanitize, set_calibration_count, FeatureVectorBuilder};
use crate::temporal::{days_between, Timestamp};
use crate::types::{CalibrationEvent, FeatureFrame, RawFeatures, StaticAttributes};

use super::normalize::TypeNormalizer;

/// Derived per-event columns, grouped by instrument and ordered within groups.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    group_keys: Vec<String>,
    type_labels: Vec<String>,
    timestamps: Vec<Timestamp>,
    nominal_intervals: Vec<Option<f64>>,
    gaps: Vec<i64>,
    raw: Vec<RawFeatures>,
}

/// Stable code when present, else the normalized type label.
fn group_key(event: &CalibrationEvent, type_label: &str) -> String {
    let code = event.instrument_code.trim();
    if code.is_empty() {
        type_label.to_string()
    } else {
        code.to_string()
    }
}

impl EventTable {
    pub fn build(
        events: Vec<CalibrationEvent>,
        builder: &FeatureVectorBuilder,
        normalizer: &TypeNormalizer,
    ) -> Self {
        let mut groups: BTreeMap<String, Vec<(String, CalibrationEvent)>> = BTreeMap::new();
        for event in events {
            let label = normalizer.normalize(&event.instrument_type);
            groups
                .entry(group_key(&event, &label))
                .or_default()
                .push((label, event));
        }

        let mut table = Self::default();
        for (key, mut members) in groups {
            // Stable, so equal timestamps keep input order.
            members.sort_by_key(|(_, e)| e.timestamp);
            let (labels, history): (Vec<String>, Vec<CalibrationEvent>) =
                members.into_iter().unzip();

            let Some(anchor) = history.first().map(|e| e.timestamp) else {
                continue;
            };
            let mut statics = StaticAttributes::default();
            for (i, event) in history.iter().enumerate() {
                statics.absorb(event);
                let predecessor = i.checked_sub(1).map(|p| &history[p]);
                let (mut raw, ts) = builder.build(event, predecessor, &statics, &anchor);
                set_calibration_count(&mut raw, i + 1);

                table.group_keys.push(key.clone());
                table.type_labels.push(labels[i].clone());
                table.timestamps.push(ts);
                table.nominal_intervals.push(event.nominal_interval_days);
                table.gaps.push(days_between(predecessor.map(|p| &p.timestamp), &ts));
                table.raw.push(raw);
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn group_keys(&self) -> &[String] {
        &self.group_keys
    }

    /// Normalized instrument-type label per row.
    pub fn type_labels(&self) -> &[String] {
        &self.type_labels
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    /// Catalog interval per row, as recorded on the event.
    pub fn nominal_intervals(&self) -> &[Option<f64>] {
        &self.nominal_intervals
    }

    /// Days since the previous event of the same group (0 for the first).
    pub fn gaps(&self) -> &[i64] {
        &self.gaps
    }

    /// Sanitized feature columns in the given schema.
    pub fn feature_frame<S: AsRef<str>>(&self, names: &[S]) -> FeatureFrame {
        let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(self.len()); names.len()];
        for raw in &self.raw {
            let fv = sanitize(raw, names);
            for (col, value) in columns.iter_mut().zip(fv.as_slice()) {
                col.push(*value);
            }
        }
        let mut frame = FeatureFrame::with_len(self.len());
        for (name, values) in names.iter().zip(columns) {
            frame.insert_column(name.as_ref(), values);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AggregationConfig, FeatureConfig};
    use crate::temporal::parse_timestamp;
    use crate::types::{InstrumentDescriptor, DIAS_DESDE_PREV, EDAD_OPERACIONAL, FEATURE_COLUMNS, NUM_CALIBRACIONES};

    fn event(code: &str, kind: &str, ts: &str) -> CalibrationEvent {
        CalibrationEvent {
            instrument_code: code.to_string(),
            timestamp: parse_timestamp(ts).expect("valid"),
            temperature: None,
            humidity: None,
            uncertainty: None,
            brand_id: None,
            nominal_interval_days: None,
            instrument_type: kind.to_string(),
            descriptor: InstrumentDescriptor::default(),
        }
    }

    fn build(events: Vec<CalibrationEvent>) -> EventTable {
        EventTable::build(
            events,
            &FeatureVectorBuilder::new(&FeatureConfig::default()),
            &TypeNormalizer::new(&AggregationConfig::default().type_corrections),
        )
    }

    #[test]
    fn test_groups_sorted_with_running_count() {
        let table = build(vec![
            event("B-2", "balanza", "2021-05-01"),
            event("A-1", "manometro", "2020-04-10"),
            event("A-1", "manometro", "2020-01-01"),
            event("B-2", "balanza", "2021-01-01"),
            event("A-1", "manometro", "2020-07-19"),
        ]);
        assert_eq!(table.len(), 5);
        assert_eq!(table.group_keys(), &["A-1", "A-1", "A-1", "B-2", "B-2"]);
        assert_eq!(table.gaps(), &[0, 100, 100, 0, 120]);

        let frame = table.feature_frame(&FEATURE_COLUMNS);
        assert_eq!(frame.column(NUM_CALIBRACIONES), Some(&[1.0, 2.0, 3.0, 1.0, 2.0][..]));
        assert_eq!(frame.column(DIAS_DESDE_PREV), Some(&[0.0, 100.0, 100.0, 0.0, 120.0][..]));
        let age = frame.column(EDAD_OPERACIONAL).expect("column");
        assert!((age[1] - 3.3).abs() < 1e-9);
        assert!(age[3].abs() < 1e-9);
        assert_eq!(table.type_labels()[0], "Manómetro");
    }

    #[test]
    fn test_missing_code_groups_by_type_label() {
        let table = build(vec![
            event("", "Termometro", "2020-01-01"),
            event(" ", "termómetro", "2020-03-01"),
        ]);
        assert_eq!(table.group_keys(), &["Termómetro", "Termómetro"]);
        assert_eq!(table.gaps(), &[0, 60]);
    }

    #[test]
    fn test_empty_table() {
        let table = build(Vec::new());
        assert!(table.is_empty());
        assert!(table.feature_frame(&FEATURE_COLUMNS).is_empty());
    }
}
