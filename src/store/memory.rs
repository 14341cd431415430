//! In-memory calibration store
//!
//! Thread-safe via `RwLock`. Not durable.

use std::sync::RwLock;

use crate::types::CalibrationEvent;

use super::{events_from_records, normalize_code, CalibrationRecord, CalibrationStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<Vec<CalibrationEvent>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<CalibrationEvent>) -> Self {
        Self {
            events: RwLock::new(events),
        }
    }

    /// Validate raw records; invalid ones are logged and skipped.
    pub fn from_records(records: Vec<CalibrationRecord>) -> Self {
        let (events, _rejected) = events_from_records(records);
        Self::from_events(events)
    }

    pub fn insert(&self, event: CalibrationEvent) -> Result<(), StoreError> {
        self.events
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))?
            .push(event);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.read().map_or(0, |events| events.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CalibrationStore for MemoryStore {
    fn full_history(&self, code: &str) -> Result<Vec<CalibrationEvent>, StoreError> {
        let code = normalize_code(code);
        let events = self
            .events
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(events
            .iter()
            .filter(|e| e.instrument_code == code)
            .cloned()
            .collect())
    }

    fn page(&self, offset: usize, limit: usize) -> Result<Vec<CalibrationEvent>, StoreError> {
        let events = self
            .events
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(events.iter().skip(offset).take(limit).cloned().collect())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
