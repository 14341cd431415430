//! Temporal Utilities
//!
//! Timestamp parsing and the elapsed-time quantities every feature depends on:
//! operational age in months and whole-day gaps between events.
//!
//! Months are a fixed 30.44-day unit, not calendar months.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use std::borrow::Cow;
use thiserror::Error;
use tracing::warn;

/// Canonical time representation: an instant with its original UTC offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Average days per month used for every day → month conversion.
pub const DAYS_PER_MONTH: f64 = 30.44;

const SECONDS_PER_DAY: i64 = 86_400;

/// Offset-aware layouts tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Naive layouts, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemporalError {
    #[error("empty timestamp")]
    Empty,
    #[error("malformed timestamp '{0}'")]
    Malformed(String),
}

/// Parse an ISO-8601-like timestamp.
///
/// A trailing `Z` is rewritten to `+00:00` before parsing. Timestamps
/// without an offset (including bare dates) are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, TemporalError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TemporalError::Empty);
    }

    let normalized = match trimmed
        .strip_suffix('Z')
        .or_else(|| trimmed.strip_suffix('z'))
    {
        Some(head) => Cow::Owned(format!("{head}+00:00")),
        None => Cow::Borrowed(trimmed),
    };

    if let Ok(ts) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(ts);
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(&normalized, fmt) {
            return Ok(ts);
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }
    if let Some(naive) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc().fixed_offset());
    }

    Err(TemporalError::Malformed(trimmed.to_string()))
}

/// Parse, falling back to the current time on failure.
///
/// Only for values that are informational (e.g. an estimated date); feature
/// computation never goes through this path.
pub fn parse_timestamp_or_now(raw: &str) -> Timestamp {
    parse_timestamp(raw).unwrap_or_else(|e| {
        warn!(raw = %raw, error = %e, "Unparseable timestamp, substituting current time");
        now()
    })
}

pub fn now() -> Timestamp {
    Utc::now().fixed_offset()
}

/// Round to one decimal place, half away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Whole days from `a` to `b`, floored. Absent `a` (no predecessor) yields 0.
pub fn days_between(a: Option<&Timestamp>, b: &Timestamp) -> i64 {
    a.map_or(0, |a| {
        b.signed_duration_since(*a)
            .num_seconds()
            .div_euclid(SECONDS_PER_DAY)
    })
}

/// Operational age in months from `anchor` to `current`, one decimal.
///
/// Negative elapsed time (clock skew, misordered input) is floored to zero:
/// operational age cannot be negative.
pub fn months_since(anchor: &Timestamp, current: &Timestamp) -> f64 {
    let days = days_between(Some(anchor), current).max(0);
    // Day counts are bounded by the calendar range chrono supports.
    #[allow(clippy::cast_precision_loss)]
    round1(days as f64 / DAYS_PER_MONTH)
}

/// Calendar month (1–12) in the timestamp's own offset.
pub fn month_of(ts: &Timestamp) -> u32 {
    ts.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(raw: &str) -> Timestamp {
        parse_timestamp(raw).expect("valid timestamp")
    }

    #[test]
    fn test_parse_zulu_suffix() {
        let t = ts("2023-04-10T08:30:00Z");
        assert_eq!(t.offset().local_minus_utc(), 0);
        assert_eq!(t.to_rfc3339(), "2023-04-10T08:30:00+00:00");
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(ts("2023-04-10").month(), 4);
        assert_eq!(ts("2023-04-10 12:00:00").month(), 4);
        assert_eq!(ts("2023-04-10T12:00:00.123456+02:00").offset().local_minus_utc(), 7200);
        assert_eq!(ts("2023-04-10 12:00:00+00:00").month(), 4);
        assert_eq!(ts("  2023-12-31T23:59  ").month(), 12);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp(""), Err(TemporalError::Empty));
        assert!(matches!(
            parse_timestamp("not-a-date"),
            Err(TemporalError::Malformed(_))
        ));
        assert!(parse_timestamp("2023-13-40").is_err());
    }

    #[test]
    fn test_parse_or_now_falls_back() {
        let before = now();
        let t = parse_timestamp_or_now("garbage");
        assert!(t >= before);
    }

    #[test]
    fn test_days_between() {
        let a = ts("2023-01-01T00:00:00Z");
        let b = a + Duration::days(100);
        assert_eq!(days_between(Some(&a), &b), 100);
        assert_eq!(days_between(None, &b), 0);
        // Partial days are floored
        let c = a + Duration::hours(47);
        assert_eq!(days_between(Some(&a), &c), 1);
    }

    #[test]
    fn test_months_since_examples() {
        let t0 = ts("2020-01-01T00:00:00Z");
        assert!((months_since(&t0, &(t0 + Duration::days(100))) - 3.3).abs() < 1e-9);
        assert!((months_since(&t0, &(t0 + Duration::days(220))) - 7.2).abs() < 1e-9);
        assert!((months_since(&t0, &t0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_months_since_never_negative() {
        let t0 = ts("2020-06-01T00:00:00Z");
        let earlier = t0 - Duration::days(45);
        assert!((months_since(&t0, &earlier)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_months_since_monotone_along_sorted_history() {
        let t0 = ts("2019-03-15T00:00:00Z");
        let mut last = 0.0;
        for d in (0..2000).step_by(37) {
            let m = months_since(&t0, &(t0 + Duration::days(d)));
            assert!(m >= 0.0);
            assert!(m >= last, "age decreased at day {d}");
            last = m;
        }
    }

    #[test]
    fn test_round1() {
        assert!((round1(3.2851) - 3.3).abs() < 1e-12);
        assert!((round1(7.2273) - 7.2).abs() < 1e-12);
    }
}
