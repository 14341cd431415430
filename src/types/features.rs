//! Feature schema, raw feature maps and sanitized feature vectors

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

// ============================================================================
// Feature Schema
// ============================================================================

pub const INCERTIDUMBRE: &str = "incertidumbre";
pub const TEMPERATURA: &str = "temperatura";
pub const HUMEDAD: &str = "humedad";
pub const MARCA_ID: &str = "marca_id";
pub const NUM_CALIBRACIONES: &str = "num_calibraciones";
pub const EDAD_OPERACIONAL: &str = "edad_operacional";
pub const DIAS_DESDE_PREV: &str = "dias_desde_prev";
pub const MES: &str = "mes";

/// Required model inputs, in the order the regression model consumes them.
///
/// Changing this list requires retraining the model in lockstep.
pub const FEATURE_COLUMNS: [&str; 8] = [
    INCERTIDUMBRE,
    TEMPERATURA,
    HUMEDAD,
    MARCA_ID,
    NUM_CALIBRACIONES,
    EDAD_OPERACIONAL,
    DIAS_DESDE_PREV,
    MES,
];

/// `FEATURE_COLUMNS` as owned names.
pub fn default_feature_names() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// Raw Features
// ============================================================================

/// An unvalidated feature value as it arrives from a request or a builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
    /// Arrays, objects or anything else with no numeric reading
    Other(serde_json::Value),
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        // Feature magnitudes (days, counts, months) stay far below 2^53.
        #[allow(clippy::cast_precision_loss)]
        Self::Number(v as f64)
    }
}

impl From<u32> for RawValue {
    fn from(v: u32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Name → raw value mapping, before sanitization.
pub type RawFeatures = BTreeMap<String, RawValue>;

// ============================================================================
// Feature Vector
// ============================================================================

/// A fully-populated, ordered vector of finite feature values.
///
/// Only the sanitizer constructs these, so every value is finite and every
/// required name is present exactly once, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub(crate) fn from_parts(names: Vec<String>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values in schema order, ready to hand to the model.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

// ============================================================================
// Feature Frame (columnar batch)
// ============================================================================

/// Column-oriented feature table for batch prediction.
///
/// Columns are keyed by feature name; every column has `len` rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    len: usize,
    columns: BTreeMap<String, Vec<f64>>,
}

impl FeatureFrame {
    pub fn with_len(len: usize) -> Self {
        Self {
            len,
            columns: BTreeMap::new(),
        }
    }

    /// Insert or replace a column. Panics in debug builds on a length mismatch.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.len, "column length must match frame");
        self.columns.insert(name.into(), values);
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_deserializes_mixed_json() {
        let raw: RawFeatures = serde_json::from_str(
            r#"{"temperatura": 21.5, "humedad": "abc", "marca_id": null, "mes": true}"#,
        )
        .expect("valid json");

        assert_eq!(raw["temperatura"], RawValue::Number(21.5));
        assert_eq!(raw["humedad"], RawValue::Text("abc".to_string()));
        assert_eq!(raw["marca_id"], RawValue::Null);
        assert_eq!(raw["mes"], RawValue::Bool(true));
    }

    #[test]
    fn test_feature_vector_serializes_in_schema_order() {
        let fv = FeatureVector::from_parts(
            vec!["b".to_string(), "a".to_string()],
            vec![2.0, 1.0],
        );
        let json = serde_json::to_string(&fv).expect("serializable");
        assert_eq!(json, r#"{"b":2.0,"a":1.0}"#);
        assert_eq!(fv.get("a"), Some(1.0));
        assert_eq!(fv.get("missing"), None);
    }

    #[test]
    fn test_feature_columns_order() {
        assert_eq!(FEATURE_COLUMNS[0], "incertidumbre");
        assert_eq!(FEATURE_COLUMNS[7], "mes");
        assert_eq!(default_feature_names().len(), 8);
    }
}
