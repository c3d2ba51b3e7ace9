//! Shared parsing utilities for raw trip records.
//!
//! Raw values arrive as JSON strings (CSV batches) or JSON numbers (other
//! sources). Empty strings and nulls are treated as missing. Anything else
//! that fails to parse is reported back as the offending text so the caller
//! can attach a record-level parse error.

use chrono::NaiveDateTime;

/// Timestamp layouts accepted for pickup and dropoff times, tried in order.
pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
];

/// Parses a trip timestamp in any of [`TIMESTAMP_FORMATS`].
///
/// A trailing `Z` is ignored; timestamps are treated as local wall time.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    let s = s.strip_suffix('Z').unwrap_or(s);
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Returns a value as trimmed text, or `None` if null or empty.
#[must_use]
pub fn value_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parses a finite float from a JSON number or numeric string.
///
/// # Errors
///
/// Returns the offending text if the value is present but not a finite
/// number.
pub fn parse_f64(value: Option<&serde_json::Value>) -> Result<Option<f64>, String> {
    let Some(value) = value else {
        return Ok(None);
    };

    let parsed = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(raw_text(value)),
    }
}

/// Parses an integer code, accepting integral floats such as `"1.0"`.
///
/// # Errors
///
/// Returns the offending text if the value is present but not an integer.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub fn parse_i64(value: Option<&serde_json::Value>) -> Result<Option<i64>, String> {
    if let Some(serde_json::Value::Number(n)) = value
        && let Some(i) = n.as_i64()
    {
        return Ok(Some(i));
    }
    if let Some(serde_json::Value::String(s)) = value
        && let Ok(i) = s.trim().parse::<i64>()
    {
        return Ok(Some(i));
    }

    match parse_f64(value) {
        Ok(None) => Ok(None),
        Ok(Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Some(f as i64)),
        Ok(Some(_)) => Err(value.map(raw_text).unwrap_or_default()),
        Err(text) => Err(text),
    }
}

fn raw_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
