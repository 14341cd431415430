//! Fleet-wide reporting types produced by the bulk aggregation engine

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an optimized interval came from.
///
/// The heuristic extension is never presented as a model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalSource {
    Model,
    Heuristic,
}

/// Per instrument-type interval summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateTypeSummary {
    #[serde(rename = "type")]
    pub instrument_type: String,
    #[serde(rename = "total")]
    pub total_count: usize,
    #[serde(rename = "stdInterval")]
    pub std_interval_days: u32,
    #[serde(rename = "optInterval")]
    pub optimized_interval_days: u32,
    #[serde(rename = "optSource")]
    pub optimized_source: IntervalSource,
}

/// One bar of the feature importance chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub variable: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMetrics {
    pub r2_score: String,
    pub processed_certificates: usize,
    /// True when predictions were requested but the batch failed
    pub model_fallback: bool,
}

/// Everything the fleet dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub ai_metrics: AiMetrics,
    /// Year → calibration counts per calendar month (January first)
    pub historical_data: BTreeMap<i32, [u32; 12]>,
    pub available_years: Vec<i32>,
    pub instrument_types: Vec<AggregateTypeSummary>,
    pub feature_importance: Vec<FeatureImportance>,
}
