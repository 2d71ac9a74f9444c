//! Value formatting: grouped numbers, dates, and generic stringification.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::fmt::Write;

/// Format a number with `,` thousands separators and at most three
/// fraction digits (trailing zeros trimmed).
///
/// ```
/// use cartel::record::format_grouped;
///
/// assert_eq!(format_grouped(250000.0), "250,000");
/// assert_eq!(format_grouped(-1234.5), "-1,234.5");
/// ```
pub fn format_grouped(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, ""));
    let frac_part = frac_part.trim_end_matches('0');

    let digits = int_part.as_bytes();
    let mut out = String::with_capacity(fixed.len() + digits.len() / 3 + 1);
    // -0.0004 rounds to "0.000"; don't print a sign in front of zero
    if value < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        out.push('-');
    }
    for (i, ch) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*ch as char);
    }
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Parse the date representations found in listing documents.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.fff]`
/// timestamps, plain `YYYY-MM-DD` dates, and extended-JSON
/// `{"$date": ...}` wrappers (string, epoch millis, or `$numberLong`).
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s),
        Value::Object(map) => match map.get("$date")? {
            Value::String(s) => parse_date_str(s),
            Value::Number(n) => DateTime::from_timestamp_millis(n.as_i64()?),
            Value::Object(inner) => {
                let millis = inner.get("$numberLong")?.as_str()?.parse::<i64>().ok()?;
                DateTime::from_timestamp_millis(millis)
            }
            _ => None,
        },
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    // Cheap reject before trying the parsers: dates start with YYYY-
    let bytes = s.as_bytes();
    if bytes.len() < 10 || !bytes[..4].iter().all(u8::is_ascii_digit) || bytes[4] != b'-' {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a date value with a chrono format string. Returns `None` when the
/// value is not a date or the format string is invalid.
pub fn format_date(value: &Value, date_format: &str) -> Option<String> {
    let date = parse_date(value)?;
    let mut out = String::new();
    write!(out, "{}", date.format(date_format)).ok()?;
    Some(out)
}

/// Type-aware stringification of a value found by path lookup.
///
/// | Value | Result |
/// |-------|--------|
/// | number | grouped (`1,234.5`) |
/// | date string / `{"$date"}` | `date_format` |
/// | bool | `Yes` / `No` |
/// | non-empty string | verbatim |
/// | non-empty array | elements joined with `, ` |
/// | object | compact JSON |
/// | null, `""`, `[]` | `None` |
pub fn stringify_value(value: &Value, date_format: &str) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        Value::Number(n) => n.as_f64().map(format_grouped),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(format_date(value, date_format).unwrap_or_else(|| s.clone())),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|v| stringify_value(v, date_format))
                .collect();
            if parts.is_empty() { None } else { Some(parts.join(", ")) }
        }
        Value::Object(map) if map.contains_key("$date") => format_date(value, date_format),
        Value::Object(_) => Some(value.to_string()),
    }
}
