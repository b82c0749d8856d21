use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read-only input to a playback session.
///
/// `popups` holds the authored JSON entries untouched; malformed entries are
/// dropped when the session starts, not when the record is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSession {
    pub id: String,
    pub media_link: String,
    pub duration_seconds: u64,
    pub popups: Vec<Value>,
}

impl VideoSession {
    pub fn new(id: impl Into<String>, media_link: impl Into<String>, duration_seconds: u64) -> Self {
        Self {
            id: id.into(),
            media_link: media_link.into(),
            duration_seconds,
            popups: Vec::new(),
        }
    }

    pub fn with_popups(mut self, popups: Vec<Value>) -> Self {
        self.popups = popups;
        self
    }
}
