use serde::Serialize;
use uuid::Uuid;

use crate::models::{PopupDefinition, VideoSession};
use crate::utils::format_clock;

use super::clock::{ClockEvent, ClockStatus, TimelineClock};
use super::error::{PlaybackError, Result};
use super::scheduler::{PopupScheduler, SchedulerEvent};
use super::state::{PhaseTimings, PopupPhase, PopupRuntimeState, VoteOutcome, VoteRejection};
use super::validation::validate_popups;

/// What the presentation layer is told about a running session.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    #[serde(rename_all = "camelCase")]
    Tick { elapsed_seconds: u64 },
    PopupActivated { definition: PopupDefinition },
    PopupPhaseChanged { phase: PopupPhase },
    PopupDeactivated,
    SessionEnded,
}

impl From<SchedulerEvent> for PlaybackEvent {
    fn from(event: SchedulerEvent) -> Self {
        match event {
            SchedulerEvent::Activated(definition) => PlaybackEvent::PopupActivated { definition },
            SchedulerEvent::PhaseChanged(phase) => PlaybackEvent::PopupPhaseChanged { phase },
            SchedulerEvent::Deactivated => PlaybackEvent::PopupDeactivated,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Running,
    Ended,
    Stopped,
}

/// Read-only projection of the popup on screen.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivePopupView {
    pub definition: PopupDefinition,
    pub phase: PopupPhase,
    pub activated_at_tick: u64,
    pub phase_entered_at_tick: u64,
    pub phase_remaining_ticks: Option<u64>,
    pub selected_option: Option<usize>,
}

impl ActivePopupView {
    fn from_state(state: &PopupRuntimeState, tick: u64, timings: &PhaseTimings) -> Self {
        Self {
            definition: state.definition.clone(),
            phase: state.phase,
            activated_at_tick: state.activated_at_tick,
            phase_entered_at_tick: state.phase_entered_at_tick,
            phase_remaining_ticks: state.remaining_ticks(tick, timings),
            selected_option: state.selected_option,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub video_id: String,
    pub media_link: String,
    pub status: PlaybackStatus,
    pub elapsed_seconds: u64,
    pub duration_seconds: u64,
    pub remaining_seconds: u64,
    pub elapsed_label: String,
    pub active_popup: Option<ActivePopupView>,
    pub dropped_popups: usize,
}

/// One playback run: a clock and the scheduler it feeds, stepped synchronously.
#[derive(Debug)]
pub struct PlaybackSession {
    session_id: String,
    video_id: String,
    media_link: String,
    clock: TimelineClock,
    scheduler: PopupScheduler,
    dropped_popups: usize,
}

impl PlaybackSession {
    /// Validates the video, starts the clock, and returns the events for tick 0.
    pub fn begin(video: &VideoSession, timings: PhaseTimings) -> Result<(Self, Vec<PlaybackEvent>)> {
        if video.duration_seconds == 0 {
            return Err(PlaybackError::InvalidSessionConfig(format!(
                "video {} has durationSeconds 0; it must be greater than zero",
                video.id
            )));
        }

        let validated = validate_popups(&video.popups);
        let mut session = Self {
            session_id: Uuid::new_v4().to_string(),
            video_id: video.id.clone(),
            media_link: video.media_link.clone(),
            clock: TimelineClock::new(video.duration_seconds),
            scheduler: PopupScheduler::new(validated.popups, timings),
            dropped_popups: validated.dropped.len(),
        };

        let clock_events = session.clock.start();
        let events = session.apply(clock_events)?;
        Ok((session, events))
    }

    /// Moves the timeline forward by one tick.
    pub fn advance(&mut self) -> Result<Vec<PlaybackEvent>> {
        let clock_events = self.clock.advance()?;
        self.apply(clock_events)
    }

    pub fn cast_vote(&mut self, option_index: usize) -> (VoteOutcome, Vec<PlaybackEvent>) {
        if !self.clock.is_running() {
            return (VoteOutcome::rejected(VoteRejection::NoActivePoll), Vec::new());
        }

        let outcome = self.scheduler.cast_vote(option_index);
        let events = match (outcome.is_accepted(), self.scheduler.active()) {
            (true, Some(active)) => vec![PlaybackEvent::PopupPhaseChanged {
                phase: active.phase,
            }],
            _ => Vec::new(),
        };
        (outcome, events)
    }

    /// Stops the clock and drops the active popup. Returns false when the
    /// session had already stopped or ended.
    pub fn stop(&mut self) -> bool {
        let was_running = self.clock.is_running();
        self.clock.stop();
        self.scheduler.clear();
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn status(&self) -> PlaybackStatus {
        match self.clock.status() {
            ClockStatus::Running | ClockStatus::Idle => PlaybackStatus::Running,
            ClockStatus::Ended => PlaybackStatus::Ended,
            ClockStatus::Stopped => PlaybackStatus::Stopped,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.clock.current_tick()
    }

    pub fn active_popup(&self) -> Option<ActivePopupView> {
        self.scheduler.active().map(|state| {
            ActivePopupView::from_state(state, self.clock.current_tick(), self.scheduler.timings())
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            video_id: self.video_id.clone(),
            media_link: self.media_link.clone(),
            status: self.status(),
            elapsed_seconds: self.clock.current_tick(),
            duration_seconds: self.clock.duration_ticks(),
            remaining_seconds: self.clock.remaining_ticks(),
            elapsed_label: format_clock(self.clock.current_tick()),
            active_popup: self.active_popup(),
            dropped_popups: self.dropped_popups,
        }
    }

    fn apply(&mut self, clock_events: Vec<ClockEvent>) -> Result<Vec<PlaybackEvent>> {
        let mut events = Vec::new();
        for clock_event in clock_events {
            match clock_event {
                ClockEvent::Tick(tick) => {
                    events.push(PlaybackEvent::Tick {
                        elapsed_seconds: tick,
                    });
                    events.extend(self.scheduler.on_tick(tick)?.into_iter().map(PlaybackEvent::from));
                }
                ClockEvent::Ended => {
                    if self.scheduler.clear() {
                        events.push(PlaybackEvent::PopupDeactivated);
                    }
                    events.push(PlaybackEvent::SessionEnded);
                }
            }
        }
        Ok(events)
    }
}
