//! Sled-backed calibration store
//!
//! Key: `code` bytes, a `0x00` separator, the timestamp in milliseconds as
//! order-preserving big-endian bytes, then a big-endian sequence id.
//! Value: JSON-serialized `CalibrationEvent`.
//!
//! Keys of one instrument are contiguous and sort chronologically, so a
//! history is a prefix scan and the latest event is its last entry.

use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::types::CalibrationEvent;

use super::{normalize_code, CalibrationStore, StoreError};

const SEPARATOR: u8 = 0x00;

#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
}

/// Flip the sign bit so pre-1970 instants still sort before later ones.
fn sortable_millis(millis: i64) -> [u8; 8] {
    #[allow(clippy::cast_sign_loss)]
    let bits = millis as u64 ^ (1 << 63);
    bits.to_be_bytes()
}

fn prefix(code: &str) -> Vec<u8> {
    let mut key = normalize_code(code).into_bytes();
    key.push(SEPARATOR);
    key
}

impl SledStore {
    /// Open or create the store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Note: does not flush per write; call `flush` after bulk imports.
    pub fn insert(&self, event: &CalibrationEvent) -> Result<(), StoreError> {
        let seq = self.db.generate_id()?;
        let mut key = prefix(&event.instrument_code);
        key.extend_from_slice(&sortable_millis(event.timestamp.timestamp_millis()));
        key.extend_from_slice(&seq.to_be_bytes());
        let value = serde_json::to_vec(event)?;
        self.db.insert(key, value)?;
        Ok(())
    }

    pub fn insert_all<'a, I>(&self, events: I) -> Result<usize, StoreError>
    where
        I: IntoIterator<Item = &'a CalibrationEvent>,
    {
        let mut n = 0;
        for event in events {
            self.insert(event)?;
            n += 1;
        }
        self.flush()?;
        Ok(n)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Total number of stored events
    pub fn count(&self) -> usize {
        self.db.len()
    }

    fn decode(value: &[u8]) -> Option<CalibrationEvent> {
        match serde_json::from_slice(value) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable calibration entry");
                None
            }
        }
    }
}

impl CalibrationStore for SledStore {
    fn full_history(&self, code: &str) -> Result<Vec<CalibrationEvent>, StoreError> {
        let mut events = Vec::new();
        for item in self.db.scan_prefix(prefix(code)) {
            let (_key, value) = item?;
            events.extend(Self::decode(&value));
        }
        Ok(events)
    }

    fn latest_event(&self, code: &str) -> Result<Option<CalibrationEvent>, StoreError> {
        for item in self.db.scan_prefix(prefix(code)).rev() {
            let (_key, value) = item?;
            if let Some(event) = Self::decode(&value) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    fn page(&self, offset: usize, limit: usize) -> Result<Vec<CalibrationEvent>, StoreError> {
        let mut events = Vec::with_capacity(limit);
        // Offsets count raw entries, so an undecodable one fails the page.
        for item in self.db.iter().skip(offset).take(limit) {
            let (_key, value) = item?;
            events.push(serde_json::from_slice(&value)?);
        }
        Ok(events)
    }

    fn backend_name(&self) -> &'static str {
        "Sled"
    }
}
