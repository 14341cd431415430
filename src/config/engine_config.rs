//! Engine Configuration - every forecasting policy constant as a TOML value
//!
//! Each section implements `Default` with the built-in constants from
//! `defaults.rs`, so an empty or missing file reproduces stock behavior.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults::*;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CALIBRATION_FORECAST_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "calibration_forecast.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration, constructed once and passed explicitly to the
/// oracle, replay engine and aggregator.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$CALIBRATION_FORECAST_CONFIG`
/// 2. `./calibration_forecast.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Feature derivation defaults and plausibility bounds
    #[serde(default)]
    pub features: FeatureConfig,

    /// Defaults for the forward (current-state) prediction
    #[serde(default)]
    pub current_state: CurrentStateConfig,

    /// Prediction post-processing policy and model location
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Historical replay fallbacks
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Fleet-wide aggregation policy
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Persistence collaborator tuning
    #[serde(default)]
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CALIBRATION_FORECAST_CONFIG` environment variable
    /// 2. `./calibration_forecast.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every policy value for internal consistency.
    ///
    /// All violations are collected into a single `ConfigError::Validation`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let finite = [
            ("features.default_temperature", self.features.default_temperature),
            ("features.default_humidity", self.features.default_humidity),
            ("current_state.default_temperature", self.current_state.default_temperature),
            ("current_state.default_humidity", self.current_state.default_humidity),
            (
                "aggregation.min_meaningful_interval_days",
                self.aggregation.min_meaningful_interval_days,
            ),
            (
                "aggregation.heuristic_extension_factor",
                self.aggregation.heuristic_extension_factor,
            ),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                errors.push(format!("{name} must be a finite number (got {value})"));
            }
        }

        let f = &self.features;
        if f.min_plausible_gap_days > f.max_plausible_gap_days {
            errors.push(format!(
                "features.min_plausible_gap_days ({}) must be <= max_plausible_gap_days ({})",
                f.min_plausible_gap_days, f.max_plausible_gap_days
            ));
        }

        let o = &self.oracle;
        if o.single_min_days == 0 {
            errors.push("oracle.single_min_days must be >= 1".to_string());
        }
        if o.batch_min_days < o.single_min_days {
            errors.push(format!(
                "oracle.batch_min_days ({}) must be >= single_min_days ({})",
                o.batch_min_days, o.single_min_days
            ));
        }

        if self.replay.fallback_days == 0 {
            errors.push("replay.fallback_days must be >= 1".to_string());
        }

        let a = &self.aggregation;
        if a.default_std_interval_days == 0 {
            errors.push("aggregation.default_std_interval_days must be >= 1".to_string());
        }
        if a.heuristic_extension_factor < 1.0 {
            errors.push(format!(
                "aggregation.heuristic_extension_factor ({:.3}) must be >= 1.0",
                a.heuristic_extension_factor
            ));
        }
        for (variant, canonical) in &a.type_corrections {
            if variant.trim().is_empty() || canonical.trim().is_empty() {
                errors.push("aggregation.type_corrections entries must be non-empty".to_string());
                break;
            }
        }

        if self.store.page_size == 0 {
            errors.push("store.page_size must be >= 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Feature Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Literal temperature fallback (°C)
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,

    /// Literal humidity fallback (%)
    #[serde(default = "default_humidity")]
    pub default_humidity: f64,

    /// Gaps below this are flagged as implausible by callers
    #[serde(default = "default_min_gap")]
    pub min_plausible_gap_days: i64,

    /// Gaps above this are flagged as implausible by callers
    #[serde(default = "default_max_gap")]
    pub max_plausible_gap_days: i64,
}

fn default_temperature() -> f64 { DEFAULT_TEMPERATURE_C }
fn default_humidity() -> f64 { DEFAULT_HUMIDITY_PCT }
fn default_min_gap() -> i64 { MIN_PLAUSIBLE_GAP_DAYS }
fn default_max_gap() -> i64 { MAX_PLAUSIBLE_GAP_DAYS }

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            default_temperature: default_temperature(),
            default_humidity: default_humidity(),
            min_plausible_gap_days: default_min_gap(),
            max_plausible_gap_days: default_max_gap(),
        }
    }
}

impl FeatureConfig {
    pub fn is_plausible_gap(&self, days: i64) -> bool {
        (self.min_plausible_gap_days..=self.max_plausible_gap_days).contains(&days)
    }
}

// ============================================================================
// Current-State Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStateConfig {
    #[serde(default = "default_current_temperature")]
    pub default_temperature: f64,

    #[serde(default = "default_current_humidity")]
    pub default_humidity: f64,
}

fn default_current_temperature() -> f64 { CURRENT_STATE_TEMPERATURE_C }
fn default_current_humidity() -> f64 { CURRENT_STATE_HUMIDITY_PCT }

impl Default for CurrentStateConfig {
    fn default() -> Self {
        Self {
            default_temperature: default_current_temperature(),
            default_humidity: default_current_humidity(),
        }
    }
}

// ============================================================================
// Oracle Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Floor for single-vector predictions (days)
    #[serde(default = "default_single_min")]
    pub single_min_days: u32,

    /// Floor for batch/reporting predictions (days)
    #[serde(default = "default_batch_min")]
    pub batch_min_days: u32,

    /// Model bundle (JSON) to load at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,
}

fn default_single_min() -> u32 { SINGLE_MIN_DAYS }
fn default_batch_min() -> u32 { BATCH_MIN_DAYS }

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            single_min_days: default_single_min(),
            batch_min_days: default_batch_min(),
            model_path: None,
        }
    }
}

// ============================================================================
// Replay Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Substitute days when a step fails before any valid prediction exists
    #[serde(default = "default_fallback_days")]
    pub fallback_days: u32,
}

fn default_fallback_days() -> u32 { REPLAY_FALLBACK_DAYS }

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            fallback_days: default_fallback_days(),
        }
    }
}

// ============================================================================
// Aggregation Config
// ============================================================================

/// Central statistic over per-type batch predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentralStatistic {
    #[default]
    Median,
    Mean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_std_interval")]
    pub default_std_interval_days: u32,

    /// Medians must exceed this to count as an interval
    #[serde(default = "default_min_meaningful")]
    pub min_meaningful_interval_days: f64,

    /// `optimized = std × factor` when no model is available
    #[serde(default = "default_extension_factor")]
    pub heuristic_extension_factor: f64,

    #[serde(default)]
    pub optimized_statistic: CentralStatistic,

    /// Known typographical variants → canonical type name.
    /// Keys are matched after normalization, case-insensitively.
    #[serde(default = "default_type_corrections")]
    pub type_corrections: BTreeMap<String, String>,
}

fn default_std_interval() -> u32 { DEFAULT_STD_INTERVAL_DAYS }
fn default_min_meaningful() -> f64 { MIN_MEANINGFUL_INTERVAL_DAYS }
fn default_extension_factor() -> f64 { HEURISTIC_EXTENSION_FACTOR }

fn default_type_corrections() -> BTreeMap<String, String> {
    [
        ("Termohigrometro", "Termohigrómetro"),
        ("Termo Higrometro", "Termohigrómetro"),
        ("Termo Higrómetro", "Termohigrómetro"),
        ("Manometro", "Manómetro"),
        ("Micrometro", "Micrómetro"),
        ("Termometro", "Termómetro"),
        ("Pie De Rey", "Calibrador Pie De Rey"),
        ("Balanza Analitica", "Balanza Analítica"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            default_std_interval_days: default_std_interval(),
            min_meaningful_interval_days: default_min_meaningful(),
            heuristic_extension_factor: default_extension_factor(),
            optimized_statistic: CentralStatistic::default(),
            type_corrections: default_type_corrections(),
        }
    }
}

// ============================================================================
// Store Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize { STORE_PAGE_SIZE }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config: EngineConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
[oracle]
batch_min_days = 45

[aggregation]
optimized_statistic = "mean"
"#,
        )
        .expect("partial TOML should parse");

        assert_eq!(config.oracle.batch_min_days, 45);
        assert_eq!(config.oracle.single_min_days, SINGLE_MIN_DAYS);
        assert_eq!(config.aggregation.optimized_statistic, CentralStatistic::Mean);
        assert_eq!(config.replay.fallback_days, REPLAY_FALLBACK_DAYS);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = EngineConfig::default();
        config.oracle.batch_min_days = 0;
        config.aggregation.heuristic_extension_factor = 0.5;
        config.features.default_temperature = f64::NAN;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_plausible_gap_bounds() {
        let f = FeatureConfig::default();
        assert!(f.is_plausible_gap(1));
        assert!(f.is_plausible_gap(3650));
        assert!(!f.is_plausible_gap(0));
        assert!(!f.is_plausible_gap(3651));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::default();
        let text = config.to_toml().expect("serializable");
        let back: EngineConfig = toml::from_str(&text).expect("parsable");
        assert_eq!(back, config);
    }
}
