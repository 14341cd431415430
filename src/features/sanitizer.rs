//! Feature Sanitizer
//!
//! Turns an arbitrary raw feature map into a complete, finite, ordered
//! `FeatureVector`. Total over its input: absent, null, non-numeric, NaN and
//! infinite values all become `0.0`, and extra keys are ignored.

use crate::types::{FeatureVector, RawFeatures, RawValue};

/// Coerce one raw value to a finite float, or `0.0`.
pub fn coerce(value: &RawValue) -> f64 {
    let v = match value {
        RawValue::Number(n) => *n,
        RawValue::Bool(b) => f64::from(u8::from(*b)),
        RawValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        RawValue::Null | RawValue::Other(_) => 0.0,
    };
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Sanitize `raw` against the required feature names, preserving their order.
pub fn sanitize<S: AsRef<str>>(raw: &RawFeatures, required: &[S]) -> FeatureVector {
    let names: Vec<String> = required.iter().map(|n| n.as_ref().to_string()).collect();
    let values = names
        .iter()
        .map(|name| raw.get(name).map_or(0.0, coerce))
        .collect();
    FeatureVector::from_parts(names, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FEATURE_COLUMNS;

    #[test]
    fn test_empty_input_yields_all_zero_schema() {
        let fv = sanitize(&RawFeatures::new(), &FEATURE_COLUMNS);
        assert_eq!(fv.len(), FEATURE_COLUMNS.len());
        assert_eq!(
            fv.names().iter().map(String::as_str).collect::<Vec<_>>(),
            FEATURE_COLUMNS.to_vec()
        );
        assert!(fv.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_non_numeric_text_becomes_zero() {
        let mut raw = RawFeatures::new();
        raw.insert("temperatura".to_string(), RawValue::from("abc"));
        raw.insert("humedad".to_string(), RawValue::from(" 55.5 "));

        let fv = sanitize(&raw, &FEATURE_COLUMNS);
        assert_eq!(fv.get("temperatura"), Some(0.0));
        assert_eq!(fv.get("humedad"), Some(55.5));
    }

    #[test]
    fn test_non_finite_values_become_zero() {
        let mut raw = RawFeatures::new();
        raw.insert("incertidumbre".to_string(), RawValue::Number(f64::NAN));
        raw.insert("marca_id".to_string(), RawValue::Number(f64::INFINITY));
        raw.insert("mes".to_string(), RawValue::Number(f64::NEG_INFINITY));
        raw.insert("edad_operacional".to_string(), RawValue::from("inf"));
        raw.insert("dias_desde_prev".to_string(), RawValue::from("NaN"));

        let fv = sanitize(&raw, &FEATURE_COLUMNS);
        assert!(fv.as_slice().iter().all(|v| v.is_finite()));
        assert!(fv.as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_null_bool_and_extra_keys() {
        let mut raw = RawFeatures::new();
        raw.insert("temperatura".to_string(), RawValue::Null);
        raw.insert("num_calibraciones".to_string(), RawValue::Bool(true));
        raw.insert("not_a_feature".to_string(), RawValue::Number(99.0));

        let fv = sanitize(&raw, &FEATURE_COLUMNS);
        assert_eq!(fv.get("temperatura"), Some(0.0));
        assert_eq!(fv.get("num_calibraciones"), Some(1.0));
        assert_eq!(fv.get("not_a_feature"), None);
        assert_eq!(fv.len(), 8);
    }

    #[test]
    fn test_structured_json_values_become_zero() {
        let raw: RawFeatures =
            serde_json::from_str(r#"{"temperatura": [21], "mes": {"a": 1}, "humedad": 48}"#)
                .expect("any JSON value is accepted");
        assert!(matches!(raw.get("temperatura"), Some(RawValue::Other(_))));

        let fv = sanitize(&raw, &FEATURE_COLUMNS);
        assert_eq!(fv.get("temperatura"), Some(0.0));
        assert_eq!(fv.get("mes"), Some(0.0));
        assert_eq!(fv.get("humedad"), Some(48.0));
    }

    #[test]
    fn test_respects_custom_order() {
        let mut raw = RawFeatures::new();
        raw.insert("b".to_string(), RawValue::Number(2.0));
        raw.insert("a".to_string(), RawValue::Number(1.0));

        let fv = sanitize(&raw, &["b", "a", "c"]);
        assert_eq!(fv.as_slice(), &[2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_total_over_adversarial_inputs() {
        let values = [
            RawValue::Number(f64::MAX),
            RawValue::Number(-0.0),
            RawValue::Text(String::new()),
            RawValue::Text("1e400".to_string()),
            RawValue::Text("-".to_string()),
            RawValue::Bool(false),
            RawValue::Null,
        ];
        for v in values {
            let mut raw = RawFeatures::new();
            for name in FEATURE_COLUMNS {
                raw.insert(name.to_string(), v.clone());
            }
            let fv = sanitize(&raw, &FEATURE_COLUMNS);
            assert_eq!(fv.len(), FEATURE_COLUMNS.len());
            assert!(fv.as_slice().iter().all(|x| x.is_finite()), "{v:?}");
        }
    }
}
