//! Persistence collaborator
//!
//! The forecasting core never talks to a database directly. It asks a
//! `CalibrationStore` for one instrument's events or for the whole fleet,
//! and every record is validated into a typed `CalibrationEvent` at this
//! boundary.
//!
//! Backends:
//! - `MemoryStore`: `RwLock`'d vector for tests and file-backed CLI runs
//! - `SledStore`: embedded sled tree keyed by code and timestamp

mod memory;
mod record;
mod sled_store;

pub use memory::MemoryStore;
pub use record::{events_from_records, load_events_json, CalibrationRecord};
pub use sled_store::SledStore;

use crate::temporal::TemporalError;
use crate::types::CalibrationEvent;

/// Trait for pluggable calibration history backends
///
/// Implementations must be thread-safe (Send + Sync); concurrent readers
/// each receive their own copies of the events.
pub trait CalibrationStore: Send + Sync {
    /// Every event of one instrument, in no particular order.
    fn full_history(&self, code: &str) -> Result<Vec<CalibrationEvent>, StoreError>;

    /// One page of the fleet-wide event collection.
    fn page(&self, offset: usize, limit: usize) -> Result<Vec<CalibrationEvent>, StoreError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Most recent event of one instrument.
    ///
    /// Among events sharing the latest timestamp, the last one stored wins.
    fn latest_event(&self, code: &str) -> Result<Option<CalibrationEvent>, StoreError> {
        let history = self.full_history(code)?;
        Ok(history
            .into_iter()
            .reduce(|best, e| if e.timestamp >= best.timestamp { e } else { best }))
    }

    /// The whole fleet, fetched page by page and assembled.
    fn all_events(&self, page_size: usize) -> Result<Vec<CalibrationEvent>, StoreError> {
        let page_size = page_size.max(1);
        let mut events = Vec::new();
        loop {
            let page = self.page(events.len(), page_size)?;
            let short = page.len() < page_size;
            events.extend(page);
            if short {
                break;
            }
        }
        tracing::debug!(backend = self.backend_name(), events = events.len(), "Fleet events assembled");
        Ok(events)
    }
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("instrument '{0}' not found")]
    NotFound(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("invalid record timestamp: {0}")]
    Timestamp(#[from] TemporalError),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Canonical instrument code: trimmed, upper-case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
