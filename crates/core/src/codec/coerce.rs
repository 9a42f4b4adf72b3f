//! Scalar coercion between application values and wire values
//!
//! Coercion is total: every input maps to some output, falling back to
//! `Null` (unparseable numbers, invalid instants) or to the input itself.
//! `Null` stays `Null` for every declared type.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use gridrest_common::encoding::{decode_base64, encode_base64};
use gridrest_domain::{format_timestamp, ColumnType, Value};

/// Coerce a value to the wire representation of `column_type`.
pub fn coerce(value: &Value, column_type: &ColumnType) -> Value {
    if value.is_null() {
        return Value::Null;
    }

    match column_type {
        integral if integral.is_integral() => to_integer(value),
        floating if floating.is_floating() => to_float(value),
        ColumnType::String => Value::Text(stringify(value)),
        ColumnType::Bool => Value::Bool(truthy(value)),
        ColumnType::Timestamp => to_instant(value)
            .map_or(Value::Null, |instant| Value::Text(format_timestamp(&instant))),
        ColumnType::Blob => match value {
            Value::Bytes(bytes) => Value::Text(encode_base64(bytes)),
            other => other.clone(),
        },
        _ => coerce_generic(value),
    }
}

/// Schema-unaware coercion: instants to ISO text, bytes to base64, all else
/// unchanged.
pub fn coerce_generic(value: &Value) -> Value {
    match value {
        Value::Timestamp(instant) => Value::Text(format_timestamp(instant)),
        Value::Bytes(bytes) => Value::Text(encode_base64(bytes)),
        other => other.clone(),
    }
}

/// Opt-in reverse conversion for a value read back from the service.
///
/// `TIMESTAMP` text becomes `Value::Timestamp`, `BLOB` base64 text becomes
/// `Value::Bytes`. Anything that does not parse is returned unchanged.
pub fn convert_from_wire(value: Value, column_type: &ColumnType) -> Value {
    match (column_type, value) {
        (ColumnType::Timestamp, Value::Text(text)) => match parse_instant(&text) {
            Some(instant) => Value::Timestamp(instant),
            None => Value::Text(text),
        },
        (ColumnType::Timestamp, Value::Integer(ms)) => {
            DateTime::from_timestamp_millis(ms).map_or(Value::Integer(ms), Value::Timestamp)
        }
        (ColumnType::Blob, Value::Text(text)) => match decode_base64(&text) {
            Some(bytes) => Value::Bytes(bytes),
            None => Value::Text(text),
        },
        (_, other) => other,
    }
}

fn to_integer(value: &Value) -> Value {
    match value {
        Value::Integer(i) => Value::Integer(*i),
        Value::Float(f) => floor_to_value(*f),
        Value::Text(text) => parse_int_prefix(text).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn floor_to_value(f: f64) -> Value {
    if !f.is_finite() {
        return Value::Null;
    }
    let floored = f.floor();
    if floored >= i64::MIN as f64 && floored < i64::MAX as f64 {
        Value::Integer(floored as i64)
    } else {
        Value::Float(floored)
    }
}

/// Base-10 integer prefix, after optional leading whitespace and sign.
/// `"42abc"` → 42, `"abc"` → `None`.
fn parse_int_prefix(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let digits = &rest[..digits_len];
    let signed = if negative { format!("-{digits}") } else { digits.to_string() };

    match signed.parse::<i64>() {
        Ok(i) => Some(Value::Integer(i)),
        Err(_) => signed.parse::<f64>().ok().map(Value::Float),
    }
}

fn to_float(value: &Value) -> Value {
    match value {
        Value::Integer(_) | Value::Float(_) => value.clone(),
        Value::Text(text) => parse_float_prefix(text).map_or(Value::Null, Value::Float),
        _ => Value::Null,
    }
}

/// Longest leading decimal literal (`[+-]digits[.digits][e[+-]digits]`) or
/// `Infinity`.
fn parse_float_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if trimmed[end..].starts_with("Infinity") {
        let sign_negative = bytes.first() == Some(&b'-');
        return Some(if sign_negative { f64::NEG_INFINITY } else { f64::INFINITY });
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    trimmed[..end].parse::<f64>().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        other => other.to_string(),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Integer(i) => *i != 0,
        Value::Float(f) => *f != 0.0 && !f.is_nan(),
        Value::Text(text) => !text.is_empty(),
        Value::Timestamp(_) | Value::Bytes(_) | Value::Json(_) => true,
    }
}

/// Interpret a value as a calendar instant: timestamps as-is, text parsed,
/// numbers as epoch milliseconds.
#[allow(clippy::cast_possible_truncation)]
fn to_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Timestamp(instant) => Some(*instant),
        Value::Text(text) => parse_instant(text),
        Value::Integer(ms) => DateTime::from_timestamp_millis(*ms),
        Value::Float(ms) if ms.is_finite() => DateTime::from_timestamp_millis(ms.trunc() as i64),
        _ => None,
    }
}

/// Parse RFC 3339 / ISO-8601 text. Strings without an offset are read as
/// UTC; a bare date means midnight UTC.
pub(crate) fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
