//! Turns authored popup JSON into [`PopupDefinition`]s.
//!
//! Entries that are missing required fields for their variant are dropped with
//! a warning; a bad popup never prevents the session from starting.

use std::collections::HashSet;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::models::{PollResult, PopupDefinition, PopupVariant};

/// Shape of one entry as the admin editor writes it. Every field is optional
/// here so the reason for a rejection can be reported precisely.
#[derive(Debug, Deserialize)]
struct RawPopup {
    time: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    options: Option<Vec<String>>,
    results: Option<Vec<Value>>,
    content: Option<String>,
    cta: Option<String>,
    link: Option<String>,
    duration: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedPopup {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidatedPopups {
    pub popups: Vec<PopupDefinition>,
    pub dropped: Vec<DroppedPopup>,
}

pub fn validate_popups(entries: &[Value]) -> ValidatedPopups {
    let mut validated = ValidatedPopups::default();

    for (index, entry) in entries.iter().enumerate() {
        match validate_popup(entry) {
            Ok(popup) => validated.popups.push(popup),
            Err(reason) => {
                warn!("Dropping popup #{index}: {reason}");
                validated.dropped.push(DroppedPopup { index, reason });
            }
        }
    }

    validated
}

pub fn validate_popup(entry: &Value) -> Result<PopupDefinition, String> {
    let raw: RawPopup =
        serde_json::from_value(entry.clone()).map_err(|err| format!("malformed entry: {err}"))?;

    let activation_time_seconds = whole_seconds(raw.time.as_ref(), "time")?
        .ok_or_else(|| "missing activation time".to_string())?;
    let title = non_blank(raw.title);

    let variant = match raw.kind.as_deref().map(str::trim) {
        Some(kind) if kind.eq_ignore_ascii_case("poll") => {
            let options = raw.options.unwrap_or_default();
            check_options(&options)?;
            PopupVariant::Poll {
                options,
                results: poll_results(raw.results.unwrap_or_default()),
            }
        }
        Some(kind) if kind.eq_ignore_ascii_case("offer") => {
            let content = non_blank(raw.content).ok_or_else(|| "offer without content".to_string())?;
            PopupVariant::Offer {
                content,
                cta: non_blank(raw.cta),
                link: non_blank(raw.link),
                duration_seconds: whole_seconds(raw.duration.as_ref(), "duration")?,
            }
        }
        Some(other) => return Err(format!("unknown popup type '{other}'")),
        None => return Err("missing popup type".to_string()),
    };

    Ok(PopupDefinition {
        activation_time_seconds,
        title,
        variant,
    })
}

/// Numbers, or strings holding one (`"5"`), as the editor sometimes saves them.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Floors fractional seconds, matching how the player compares times.
fn whole_seconds(value: Option<&Value>, field: &str) -> Result<Option<u64>, String> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    match as_number(value) {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v.floor() as u64)),
        _ => Err(format!("{field} must be a non-negative number")),
    }
}

/// Results are display-only, so unreadable rows are skipped instead of
/// dropping the poll.
fn poll_results(rows: Vec<Value>) -> Vec<PollResult> {
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let label = row
                .get("label")
                .or_else(|| row.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let percentage = row.get("percentage").and_then(as_number);
            match (label, percentage) {
                (Some(label), Some(percentage)) => Some(PollResult { label, percentage }),
                _ => {
                    warn!("Skipping unreadable poll result row #{index}: {row}");
                    None
                }
            }
        })
        .collect()
}

fn check_options(options: &[String]) -> Result<(), String> {
    if options.is_empty() {
        return Err("poll without options".to_string());
    }

    let mut seen = HashSet::new();
    for option in options {
        if option.trim().is_empty() {
            return Err("poll option label is blank".to_string());
        }
        if !seen.insert(option.as_str()) {
            return Err(format!("duplicate poll option '{option}'"));
        }
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_admin_sample() {
        let entries = vec![
            json!({
                "time": 5,
                "type": "poll",
                "title": "What is your biggest challenge?",
                "content": "Choose one:",
                "options": ["User retention", "Conversion rates", "User engagement"],
                "results": [
                    { "text": "User retention", "percentage": 40 },
                    { "text": "Conversion rates", "percentage": 35 },
                    { "text": "User engagement", "percentage": 25 }
                ]
            }),
            json!({
                "time": 40,
                "duration": 20,
                "type": "offer",
                "title": "Exclusive Deal!",
                "content": "https://placehold.co/600x400",
                "cta": "Get the Deal",
                "link": "#"
            }),
        ];

        let validated = validate_popups(&entries);
        assert!(validated.dropped.is_empty());
        assert_eq!(validated.popups.len(), 2);
        assert!(validated.popups[0].is_poll());
        assert_eq!(validated.popups[1].offer_duration(99), Some(20));
    }

    #[test]
    fn floors_fractional_times() {
        let popup = validate_popup(&json!({"time": 12.9, "type": "offer", "content": "img.png"})).unwrap();
        assert_eq!(popup.activation_time_seconds, 12);
    }

    #[test]
    fn drops_invalid_entries_and_keeps_the_rest() {
        let entries = vec![
            json!({"time": 1, "type": "poll", "options": []}),
            json!({"time": 2, "type": "poll", "options": ["A", "A"]}),
            json!({"time": 3, "type": "offer"}),
            json!({"type": "offer", "content": "x"}),
            json!({"time": -4, "type": "offer", "content": "x"}),
            json!({"time": 5, "type": "survey"}),
            json!("not an object"),
            json!({"time": 6, "type": "Poll", "options": ["Yes", "No"]}),
        ];

        let validated = validate_popups(&entries);
        assert_eq!(validated.popups.len(), 1);
        assert_eq!(validated.popups[0].activation_time_seconds, 6);
        let dropped: Vec<usize> = validated.dropped.iter().map(|d| d.index).collect();
        assert_eq!(dropped, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn missing_results_default_to_empty() {
        let popup = validate_popup(&json!({"time": 0, "type": "poll", "options": ["A"]})).unwrap();
        match popup.variant {
            PopupVariant::Poll { results, .. } => assert!(results.is_empty()),
            PopupVariant::Offer { .. } => panic!("expected poll"),
        }
    }

    #[test]
    fn unreadable_result_rows_do_not_drop_the_poll() {
        let popup = validate_popup(&json!({
            "time": 5,
            "type": "poll",
            "options": ["A", "B"],
            "results": [
                { "text": "A" },
                { "text": "B", "percentage": "40" },
                "garbage",
                { "label": "A", "percentage": 60 }
            ]
        }))
        .unwrap();

        match popup.variant {
            PopupVariant::Poll { results, .. } => assert_eq!(
                results,
                vec![
                    PollResult { label: "B".into(), percentage: 40.0 },
                    PollResult { label: "A".into(), percentage: 60.0 },
                ]
            ),
            PopupVariant::Offer { .. } => panic!("expected poll"),
        }
    }

    #[test]
    fn numeric_strings_are_accepted_for_times() {
        let popup =
            validate_popup(&json!({"time": "7.5", "duration": "12", "type": "offer", "content": "x"}))
                .unwrap();
        assert_eq!(popup.activation_time_seconds, 7);
        assert_eq!(popup.offer_duration(20), Some(12));

        assert!(validate_popup(&json!({"time": "soon", "type": "offer", "content": "x"})).is_err());
    }
}
