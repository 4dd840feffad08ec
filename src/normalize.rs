//! Coercion of untyped tool arguments.
//!
//! The reasoning service produces arguments as free-form JSON. Every value
//! goes through these helpers before it reaches a query, so adapters only
//! ever see a trimmed non-empty string or an integer.

use serde_json::Value;

/// Trimmed string, or `None` for absent, blank or structured values.
///
/// Numbers and booleans are accepted in their textual form.
pub fn normalize_string(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Integer coercion that never fails.
///
/// Floats truncate toward zero, numeric strings are parsed after trimming,
/// booleans map to 0/1. Anything else is `None`.
pub fn normalize_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Limits below zero mean "no limit".
pub fn non_negative(limit: Option<i64>) -> Option<usize> {
    limit.and_then(|n| usize::try_from(n).ok())
}
