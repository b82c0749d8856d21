use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::playback::PhaseTimings;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackSettings {
    pub tick_interval_ms: u64,
    pub heartbeat_every_ticks: u32,
    pub event_buffer_size: usize,
    pub poll_voting_ticks: u64,
    pub poll_thank_you_ticks: u64,
    pub poll_results_ticks: u64,
    pub offer_default_ticks: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        let timings = PhaseTimings::default();
        Self {
            tick_interval_ms: 1_000,
            heartbeat_every_ticks: 10,
            event_buffer_size: 256,
            poll_voting_ticks: timings.poll_voting_ticks,
            poll_thank_you_ticks: timings.poll_thank_you_ticks,
            poll_results_ticks: timings.poll_results_ticks,
            offer_default_ticks: timings.offer_default_ticks,
        }
    }
}

impl PlaybackSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn phase_timings(&self) -> PhaseTimings {
        PhaseTimings {
            poll_voting_ticks: self.poll_voting_ticks,
            poll_thank_you_ticks: self.poll_thank_you_ticks,
            poll_results_ticks: self.poll_results_ticks,
            offer_default_ticks: self.offer_default_ticks,
        }
    }

    /// `WEBINAR_DEBUG=1` logs a heartbeat on every tick.
    pub fn with_env_overrides(mut self) -> Self {
        let debug_mode = std::env::var("WEBINAR_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.heartbeat_every_ticks = 1;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tickIntervalMs must be greater than zero");
        }
        if self.heartbeat_every_ticks == 0 {
            bail!("heartbeatEveryTicks must be greater than zero");
        }
        if self.event_buffer_size == 0 {
            bail!("eventBufferSize must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserSettings {
    playback: PlaybackSettings,
}

/// JSON settings file in the data directory, cached behind a lock.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        data.playback
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        let existed = path.exists();
        let store = Self {
            path,
            data: RwLock::new(data),
        };
        if !existed {
            store.persist(&store.read())?;
        }
        Ok(store)
    }

    pub fn playback(&self) -> PlaybackSettings {
        self.read().playback.clone()
    }

    pub fn update_playback(&self, settings: PlaybackSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        guard.playback = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
