use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::warn;
use serde_json::Value;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

/// Reads a JSON-array text column, tolerating the escaped form older rows
/// were saved in (`[{\"time\": 5}]`). Anything that is not an array is
/// discarded with a warning.
pub fn parse_json_list(raw: &str) -> Vec<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let parsed = serde_json::from_str::<Value>(raw)
        .or_else(|_| serde_json::from_str::<Value>(&raw.replace("\\\"", "\"")));

    match parsed {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            warn!("Expected a JSON array, found {}; treating as empty", kind_of(&other));
            Vec::new()
        }
        Err(err) => {
            warn!("Unreadable JSON list column: {err}");
            Vec::new()
        }
    }
}

/// Reads the `texts` column: a JSON array of strings, or a bare string that
/// becomes a single line.
pub fn parse_texts(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        Ok(_) => Vec::new(),
        Err(_) => vec![raw.to_string()],
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_list_accepts_plain_and_escaped_arrays() {
        assert_eq!(parse_json_list(r#"[{"time": 5}]"#).len(), 1);
        assert_eq!(parse_json_list(r#"[{\"time\": 5}, {\"time\": 9}]"#).len(), 2);
    }

    #[test]
    fn json_list_discards_non_arrays() {
        assert!(parse_json_list("").is_empty());
        assert!(parse_json_list(r#"{"time": 5}"#).is_empty());
        assert!(parse_json_list("not json").is_empty());
    }

    #[test]
    fn texts_fall_back_to_single_line() {
        assert_eq!(parse_texts(r#"["a", "b"]"#), vec!["a", "b"]);
        assert_eq!(parse_texts("Just one line"), vec!["Just one line"]);
        assert!(parse_texts("   ").is_empty());
    }

    #[test]
    fn integer_conversions_guard_ranges() {
        assert!(to_i64(u64::MAX).is_err());
        assert!(to_u64(-1, "duration_seconds").is_err());
        assert_eq!(to_u64(60, "duration_seconds").unwrap(), 60);
    }
}
