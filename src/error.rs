//! Error taxonomy for forecasting operations
//!
//! Per-event failures inside replay and aggregation loops are recovered
//! locally and counted; these errors describe what reaches the caller.

use thiserror::Error;

use crate::config::ConfigError;
use crate::oracle::ModelError;
use crate::store::StoreError;
use crate::temporal::TemporalError;

#[derive(Debug, Error)]
pub enum ForecastError {
    /// A timestamp or numeric field could not be interpreted
    #[error("parse error: {0}")]
    Parse(#[from] TemporalError),

    /// Instrument, history or required input not found
    #[error("missing data: {0}")]
    MissingData(String),

    /// The model produced NaN or an infinite value
    #[error("model produced an invalid prediction ({value})")]
    InvalidPrediction { value: f64 },

    /// No model loaded, or the model failed while being invoked
    #[error("prediction oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("model invocation failed: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification for transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    MissingData,
    InvalidPrediction,
    OracleUnavailable,
    Storage,
    Config,
}

impl ErrorKind {
    /// HTTP status a transport layer should report for this kind.
    pub fn status_hint(self) -> u16 {
        match self {
            Self::Parse => 400,
            Self::MissingData => 404,
            Self::InvalidPrediction | Self::Storage | Self::Config => 500,
            Self::OracleUnavailable => 503,
        }
    }
}

impl ForecastError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse(_) => ErrorKind::Parse,
            Self::MissingData(_) => ErrorKind::MissingData,
            Self::InvalidPrediction { .. } => ErrorKind::InvalidPrediction,
            Self::OracleUnavailable(_) | Self::Model(_) => ErrorKind::OracleUnavailable,
            Self::Store(StoreError::NotFound(_)) => ErrorKind::MissingData,
            Self::Store(StoreError::Timestamp(_)) => ErrorKind::Parse,
            Self::Store(_) => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}
