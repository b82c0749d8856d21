//! Popup definitions as the playback core sees them.
//!
//! Authoring JSON (`{"time": 5, "type": "poll", ...}`) is parsed and checked by
//! `playback::validation`; everything here is already well-formed.

use serde::{Deserialize, Serialize};

pub const DEFAULT_OFFER_DURATION_SECS: u64 = 20;

/// A timed overlay scheduled against the playback timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopupDefinition {
    /// Offset from session start, in ticks.
    pub activation_time_seconds: u64,
    pub title: Option<String>,
    #[serde(flatten)]
    pub variant: PopupVariant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PopupVariant {
    #[serde(rename_all = "camelCase")]
    Poll {
        options: Vec<String>,
        results: Vec<PollResult>,
    },
    #[serde(rename_all = "camelCase")]
    Offer {
        content: String,
        cta: Option<String>,
        link: Option<String>,
        duration_seconds: Option<u64>,
    },
}

/// Author-supplied display row for the post-vote screen. Percentages are shown
/// as given and never normalised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    #[serde(alias = "text")]
    pub label: String,
    pub percentage: f64,
}

impl PopupDefinition {
    pub fn is_poll(&self) -> bool {
        matches!(self.variant, PopupVariant::Poll { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self.variant {
            PopupVariant::Poll { .. } => "poll",
            PopupVariant::Offer { .. } => "offer",
        }
    }

    /// Number of selectable options; zero for offers.
    pub fn option_count(&self) -> usize {
        match &self.variant {
            PopupVariant::Poll { options, .. } => options.len(),
            PopupVariant::Offer { .. } => 0,
        }
    }

    /// Ticks an offer stays on screen, falling back to `default_ticks`.
    pub fn offer_duration(&self, default_ticks: u64) -> Option<u64> {
        match &self.variant {
            PopupVariant::Offer {
                duration_seconds, ..
            } => Some(duration_seconds.unwrap_or(default_ticks)),
            PopupVariant::Poll { .. } => None,
        }
    }
}

/// Fixtures for scheduler and state tests.
#[cfg(test)]
impl PopupDefinition {
    pub fn poll(activation_time_seconds: u64, options: &[&str]) -> Self {
        Self {
            activation_time_seconds,
            title: None,
            variant: PopupVariant::Poll {
                options: options.iter().map(|o| o.to_string()).collect(),
                results: Vec::new(),
            },
        }
    }

    pub fn offer(activation_time_seconds: u64, content: impl Into<String>) -> Self {
        Self {
            activation_time_seconds,
            title: None,
            variant: PopupVariant::Offer {
                content: content.into(),
                cta: None,
                link: None,
                duration_seconds: None,
            },
        }
    }
}
