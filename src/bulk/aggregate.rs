//! Bulk Aggregation Engine
//!
//! Fleet-wide interval report: per-type standard and optimized intervals,
//! a monthly calibration histogram, and model metrics for the dashboard.
//!
//! ## Interval rules
//! - standard: median catalog interval if meaningful, else median observed
//!   gap (positive gaps only) if meaningful, else the configured default
//! - optimized: central statistic of batch predictions when a model ran,
//!   else `standard × extension factor`, flagged as heuristic

use chrono::Datelike;
use statrs::statistics::{Data, Median, Statistics};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::defaults::DEFAULT_MODEL_R2;
use crate::config::{AggregationConfig, CentralStatistic, EngineConfig};
use crate::error::ForecastError;
use crate::features::FeatureVectorBuilder;
use crate::oracle::{feature_importance_list, PredictionOracle};
use crate::temporal::Timestamp;
use crate::types::{
    AggregateTypeSummary, AiMetrics, CalibrationEvent, DashboardReport, IntervalSource,
};

use super::normalize::TypeNormalizer;
use super::table::EventTable;

/// Per-type summaries plus how they were produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    /// Sorted by descending total, then by type name
    pub summaries: Vec<AggregateTypeSummary>,
    /// A model was available but batch prediction failed
    pub model_fallback: bool,
    pub processed: usize,
}

/// Runs fleet-wide aggregation with an optional oracle.
pub struct BulkAggregator<'a> {
    oracle: Option<&'a PredictionOracle>,
    builder: FeatureVectorBuilder,
    normalizer: TypeNormalizer,
    config: AggregationConfig,
}

impl<'a> BulkAggregator<'a> {
    pub fn new(oracle: Option<&'a PredictionOracle>, config: &EngineConfig) -> Self {
        Self {
            oracle,
            builder: FeatureVectorBuilder::new(&config.features),
            normalizer: TypeNormalizer::new(&config.aggregation.type_corrections),
            config: config.aggregation.clone(),
        }
    }

    pub fn build_table(&self, events: Vec<CalibrationEvent>) -> EventTable {
        EventTable::build(events, &self.builder, &self.normalizer)
    }

    /// Batch predictions for every row, or `None` when no model is loaded
    /// or the batch failed (the failure is logged, never propagated).
    fn batch_predictions(&self, table: &EventTable) -> (Option<Vec<u32>>, bool) {
        let Some(oracle) = self.oracle else {
            return (None, false);
        };
        let frame = table.feature_frame(oracle.feature_names());
        match oracle.predict_batch(&frame) {
            Ok(days) => (Some(days), false),
            Err(e) => {
                warn!(rows = table.len(), error = %e, "Batch prediction failed, using heuristic intervals");
                (None, true)
            }
        }
    }

    pub fn aggregate(&self, table: &EventTable) -> AggregationOutcome {
        let (predictions, model_fallback) = self.batch_predictions(table);

        #[derive(Default)]
        struct Bucket {
            total: usize,
            catalog: Vec<f64>,
            gaps: Vec<f64>,
            predicted: Vec<f64>,
        }

        let mut buckets: BTreeMap<&str, Bucket> = BTreeMap::new();
        for i in 0..table.len() {
            let bucket = buckets.entry(table.type_labels()[i].as_str()).or_default();
            bucket.total += 1;
            if let Some(nominal) = table.nominal_intervals()[i].filter(|v| v.is_finite()) {
                bucket.catalog.push(nominal);
            }
            let gap = table.gaps()[i];
            if gap > 0 {
                #[allow(clippy::cast_precision_loss)]
                bucket.gaps.push(gap as f64);
            }
            if let Some(days) = predictions.as_ref().and_then(|p| p.get(i)) {
                bucket.predicted.push(f64::from(*days));
            }
        }

        let mut summaries: Vec<AggregateTypeSummary> = buckets
            .into_iter()
            .map(|(label, bucket)| {
                let std = self.standard_interval(&bucket.catalog, &bucket.gaps);
                let (optimized, source) = match self.central(&bucket.predicted) {
                    Some(v) => (to_days(v), IntervalSource::Model),
                    None => (
                        to_days(f64::from(std) * self.config.heuristic_extension_factor),
                        IntervalSource::Heuristic,
                    ),
                };
                debug!(instrument_type = label, total = bucket.total, std, optimized, ?source, "Type aggregated");
                AggregateTypeSummary {
                    instrument_type: label.to_string(),
                    total_count: bucket.total,
                    std_interval_days: std,
                    optimized_interval_days: optimized,
                    optimized_source: source,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.total_count
                .cmp(&a.total_count)
                .then_with(|| a.instrument_type.cmp(&b.instrument_type))
        });

        info!(
            rows = table.len(),
            types = summaries.len(),
            model = predictions.is_some(),
            model_fallback,
            "Bulk aggregation complete"
        );

        AggregationOutcome {
            summaries,
            model_fallback,
            processed: table.len(),
        }
    }

    fn standard_interval(&self, catalog: &[f64], gaps: &[f64]) -> u32 {
        let threshold = self.config.min_meaningful_interval_days;
        [catalog, gaps]
            .into_iter()
            .filter_map(median)
            .find(|m| *m > threshold)
            .map_or(self.config.default_std_interval_days, to_days)
    }

    fn central(&self, values: &[f64]) -> Option<f64> {
        match self.config.optimized_statistic {
            CentralStatistic::Median => median(values),
            CentralStatistic::Mean => mean(values),
        }
    }

    /// Full dashboard over an assembled event collection.
    pub fn dashboard(&self, events: Vec<CalibrationEvent>) -> Result<DashboardReport, ForecastError> {
        if events.is_empty() {
            return Err(ForecastError::MissingData("no calibration events".to_string()));
        }
        let table = self.build_table(events);
        let outcome = self.aggregate(&table);
        let historical_data = monthly_histogram(table.timestamps());
        let available_years = historical_data.keys().copied().collect();

        let r2 = self.oracle.map_or(DEFAULT_MODEL_R2, |o| o.metrics().r2);

        Ok(DashboardReport {
            ai_metrics: AiMetrics {
                r2_score: format!("{r2:.2}"),
                processed_certificates: outcome.processed,
                model_fallback: outcome.model_fallback,
            },
            historical_data,
            available_years,
            instrument_types: outcome.summaries,
            feature_importance: feature_importance_list(self.oracle.map(PredictionOracle::bundle)),
        })
    }
}

/// Calibrations per calendar month, keyed by year.
pub fn monthly_histogram(timestamps: &[Timestamp]) -> BTreeMap<i32, [u32; 12]> {
    let mut histogram: BTreeMap<i32, [u32; 12]> = BTreeMap::new();
    for ts in timestamps {
        let months = histogram.entry(ts.year()).or_insert([0; 12]);
        months[ts.month0() as usize] += 1;
    }
    histogram
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let m = Data::new(values.to_vec()).median();
    m.is_finite().then_some(m)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let m = values.iter().mean();
    m.is_finite().then_some(m)
}

/// Whole days, truncated toward zero and saturated at the `u32` bounds.
fn to_days(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let days = value.trunc() as u32;
        days
    }
}
