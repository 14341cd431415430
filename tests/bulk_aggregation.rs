//! Bulk Aggregation Tests
//!
//! Fleet-wide aggregation through the public API: interval rules, batch
//! floors, heuristic mode, label normalization and the dashboard report.

use chrono::Duration;
use std::sync::Arc;

use calibration_forecast::config::{CentralStatistic, EngineConfig};
use calibration_forecast::oracle::{FnModel, ModelBundle, ModelError};
use calibration_forecast::temporal::{parse_timestamp, Timestamp};
use calibration_forecast::types::{
    FeatureFrame, IntervalSource, InstrumentDescriptor, DIAS_DESDE_PREV, FEATURE_COLUMNS,
};
use calibration_forecast::{BulkAggregator, CalibrationEvent, LinearModel, PredictionOracle};

fn event(code: &str, kind: &str, ts: Timestamp, nominal: Option<f64>) -> CalibrationEvent {
    CalibrationEvent {
        instrument_code: code.to_string(),
        timestamp: ts,
        temperature: Some(21.0),
        humidity: Some(48.0),
        uncertainty: Some(0.02),
        brand_id: Some(1.0),
        nominal_interval_days: nominal,
        instrument_type: kind.to_string(),
        descriptor: InstrumentDescriptor::default(),
    }
}

fn t0() -> Timestamp {
    parse_timestamp("2021-02-01T12:00:00Z").expect("valid")
}

/// Predicts `dias_desde_prev - 40`, so short gaps fall under the batch floor.
fn gap_oracle() -> PredictionOracle {
    let idx = FEATURE_COLUMNS
        .iter()
        .position(|c| *c == DIAS_DESDE_PREV)
        .expect("schema column");
    let model = FnModel(move |row: &[f64]| -> Result<f64, ModelError> { Ok(row[idx] - 40.0) });
    let bundle = ModelBundle::with_default_schema(Arc::new(model)).expect("bundle");
    PredictionOracle::new(bundle, &EngineConfig::default().oracle)
}

fn fleet() -> Vec<CalibrationEvent> {
    let t = t0();
    vec![
        // Manómetro: catalog says 365
        event("MN-1", "Manómetro", t, Some(365.0)),
        event("MN-1", "manometro", t + Duration::days(300), Some(365.0)),
        event("MN-2", "MANÓMETRO ", t + Duration::days(10), Some(365.0)),
        // Balanza: no catalog, gaps of 200 and 240
        event("BA-1", "balanza  analitica", t, None),
        event("BA-1", "Balanza Analítica", t + Duration::days(200), None),
        event("BA-1", "Balanza Analítica", t + Duration::days(440), None),
        // Termómetro: single event, nothing meaningful
        event("TM-1", "Termometro", t, Some(0.0)),
    ]
}

#[test]
fn heuristic_mode_without_model() {
    let config = EngineConfig::default();
    let agg = BulkAggregator::new(None, &config);
    let outcome = agg.aggregate(&agg.build_table(fleet()));

    assert!(!outcome.model_fallback);
    assert_eq!(outcome.processed, 7);

    let names: Vec<&str> = outcome
        .summaries
        .iter()
        .map(|s| s.instrument_type.as_str())
        .collect();
    assert_eq!(names, vec!["Balanza Analítica", "Manómetro", "Termómetro"]);

    let balanza = &outcome.summaries[0];
    assert_eq!(balanza.total_count, 3);
    assert_eq!(balanza.std_interval_days, 220);
    assert_eq!(balanza.optimized_interval_days, 242);
    assert_eq!(balanza.optimized_source, IntervalSource::Heuristic);

    let manometro = &outcome.summaries[1];
    assert_eq!(manometro.std_interval_days, 365);

    let termometro = &outcome.summaries[2];
    assert_eq!(termometro.std_interval_days, 180);
    assert_eq!(termometro.optimized_interval_days, 198);
}

#[test]
fn model_mode_uses_batch_median_with_floor() {
    let oracle = gap_oracle();
    let config = EngineConfig::default();
    let agg = BulkAggregator::new(Some(&oracle), &config);
    let outcome = agg.aggregate(&agg.build_table(fleet()));

    assert!(outcome
        .summaries
        .iter()
        .all(|s| s.optimized_source == IntervalSource::Model));

    // Balanza gaps 0, 200, 240 → predictions 30 (floored), 160, 200
    let balanza = &outcome.summaries[0];
    assert_eq!(balanza.optimized_interval_days, 160);

    // Termómetro: gap 0 → -40 → floored to 30
    let termometro = &outcome.summaries[2];
    assert_eq!(termometro.optimized_interval_days, 30);
}

#[test]
fn mean_statistic_is_configurable() {
    let oracle = gap_oracle();
    let mut config = EngineConfig::default();
    config.aggregation.optimized_statistic = CentralStatistic::Mean;
    let agg = BulkAggregator::new(Some(&oracle), &config);
    let outcome = agg.aggregate(&agg.build_table(fleet()));

    // (30 + 160 + 200) / 3 = 130
    assert_eq!(outcome.summaries[0].optimized_interval_days, 130);
}

#[test]
fn batch_predictions_never_below_thirty() {
    let oracle = gap_oracle();
    let config = EngineConfig::default();
    let agg = BulkAggregator::new(Some(&oracle), &config);
    let table = agg.build_table(fleet());

    let days = oracle
        .predict_batch(&table.feature_frame(oracle.feature_names()))
        .expect("batch");
    assert_eq!(days.len(), table.len());
    assert!(days.iter().all(|d| *d >= 30));

    // Missing columns are zero-filled rather than rejected.
    let empty_columns = FeatureFrame::with_len(4);
    assert_eq!(oracle.predict_batch(&empty_columns).expect("batch"), vec![30; 4]);
}

#[test]
fn failed_batch_falls_back_to_heuristic() {
    let model = FnModel(|_: &[f64]| -> Result<f64, ModelError> { Ok(f64::INFINITY) });
    let bundle = ModelBundle::with_default_schema(Arc::new(model)).expect("bundle");
    let oracle = PredictionOracle::new(bundle, &EngineConfig::default().oracle);
    let config = EngineConfig::default();
    let agg = BulkAggregator::new(Some(&oracle), &config);

    let outcome = agg.aggregate(&agg.build_table(fleet()));
    assert!(outcome.model_fallback);
    assert!(outcome
        .summaries
        .iter()
        .all(|s| s.optimized_source == IntervalSource::Heuristic));
}

#[test]
fn dashboard_report_shape() {
    let model = LinearModel {
        intercept: 120.0,
        coefficients: vec![0.0; 8],
        importances: Some(vec![0.05, 0.05, 0.05, 0.05, 0.2, 0.3, 0.25, 0.05]),
    };
    let bundle = ModelBundle::with_default_schema(Arc::new(model)).expect("bundle");
    let oracle = PredictionOracle::new(bundle, &EngineConfig::default().oracle);
    let config = EngineConfig::default();
    let report = BulkAggregator::new(Some(&oracle), &config)
        .dashboard(fleet())
        .expect("dashboard");

    assert_eq!(report.ai_metrics.processed_certificates, 7);
    assert_eq!(report.available_years, vec![2021, 2022]);
    let total: u32 = report.historical_data.values().flat_map(|m| m.iter()).sum();
    assert_eq!(total, 7);
    assert_eq!(report.feature_importance[0].variable, "Edad Operacional");
    assert!((report.feature_importance[0].importance - 30.0).abs() < 1e-9);

    let json = serde_json::to_value(&report).expect("serializable");
    assert!(json["aiMetrics"]["r2Score"].is_string());
    assert!(json["instrumentTypes"][0]["stdInterval"].is_u64());
    assert!(json["historicalData"]["2021"].is_array());
}
