//! Catalog record for a replayable webinar.
//!
//! Field aliases accept the names the admin editor posts (`time`, `duration`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::db::helpers::{parse_json_list, parse_texts};
use crate::models::VideoSession;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub link: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub image: Option<String>,
    /// Local time of day the replay goes "live", `HH:MM`.
    pub scheduled_time: Option<String>,
    pub duration_seconds: u64,
    pub action_guide: Option<String>,
    pub texts: Vec<String>,
    pub popups: Vec<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn to_session(&self) -> VideoSession {
        VideoSession {
            id: self.id.to_string(),
            media_link: self.link.clone(),
            duration_seconds: self.duration_seconds,
            popups: self.popups.clone(),
        }
    }
}

/// Fields supplied when creating or replacing a video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoInput {
    pub link: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "time")]
    pub scheduled_time: Option<String>,
    #[serde(alias = "duration")]
    pub duration_seconds: u64,
    #[serde(default)]
    pub action_guide: Option<String>,
    #[serde(default, deserialize_with = "texts_from_any")]
    pub texts: Vec<String>,
    #[serde(default, deserialize_with = "popups_from_any")]
    pub popups: Vec<Value>,
}

fn texts_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => parse_texts(&raw),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// The editor sends popups either as an array or as the raw JSON text.
fn popups_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => parse_json_list(&raw),
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

pub mod validation {
    use super::VideoInput;
    use crate::countdown::parse_scheduled_time;
    use anyhow::{bail, Result};

    pub const MAX_TEXTS: usize = 5;

    pub fn validate_input(input: &VideoInput) -> Result<()> {
        if input.link.trim().is_empty() {
            bail!("link is required");
        }
        if input.title.trim().is_empty() {
            bail!("title is required");
        }
        if input.duration_seconds == 0 {
            bail!("durationSeconds must be greater than zero");
        }
        if input.texts.len() > MAX_TEXTS {
            bail!("At most {MAX_TEXTS} texts are allowed");
        }
        if let Some(time) = &input.scheduled_time {
            parse_scheduled_time(time)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validation::validate_input;
    use super::*;

    fn sample_input() -> VideoInput {
        serde_json::from_str(
            r#"{
                "link": "https://cdn.example.com/replay.mp4",
                "title": "Growth webinar",
                "time": "18:30",
                "duration": 3600,
                "texts": ["Learn the funnel", "Live Q&A"],
                "popups": "[{\"time\": 5, \"type\": \"poll\", \"options\": [\"A\", \"B\"]}]"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn accepts_editor_field_names() {
        let input = sample_input();
        assert_eq!(input.scheduled_time.as_deref(), Some("18:30"));
        assert_eq!(input.duration_seconds, 3600);
        assert_eq!(input.popups.len(), 1);
        assert_eq!(input.popups[0]["type"], "poll");
        validate_input(&input).unwrap();
    }

    #[test]
    fn rejects_too_many_texts() {
        let mut input = sample_input();
        input.texts = (0..6).map(|i| format!("line {i}")).collect();
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn rejects_bad_time_and_zero_duration() {
        let mut input = sample_input();
        input.scheduled_time = Some("25:99".into());
        assert!(validate_input(&input).is_err());

        let mut input = sample_input();
        input.duration_seconds = 0;
        assert!(validate_input(&input).is_err());
    }
}
