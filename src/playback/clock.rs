use serde::Serialize;

use super::error::{PlaybackError, Result};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClockStatus {
    Idle,
    Running,
    Ended,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Tick(u64),
    /// Emitted once, right after the terminal tick.
    Ended,
}

/// Discrete one-second counter bounded by the session duration.
///
/// Wall-clock pacing lives in the controller's ticker; this type only decides
/// which tick comes next and when the timeline is over.
#[derive(Debug, Clone)]
pub struct TimelineClock {
    duration_ticks: u64,
    current_tick: u64,
    status: ClockStatus,
}

impl TimelineClock {
    pub fn new(duration_ticks: u64) -> Self {
        Self {
            duration_ticks,
            current_tick: 0,
            status: ClockStatus::Idle,
        }
    }

    /// Resets to tick 0 and returns the events for it.
    pub fn start(&mut self) -> Vec<ClockEvent> {
        self.current_tick = 0;
        self.status = ClockStatus::Running;
        self.emit_current()
    }

    /// Moves one tick forward.
    pub fn advance(&mut self) -> Result<Vec<ClockEvent>> {
        if self.status != ClockStatus::Running {
            return Err(PlaybackError::ClockStopped);
        }
        self.current_tick += 1;
        Ok(self.emit_current())
    }

    /// Idempotent; a clock that already ended keeps its `Ended` status.
    pub fn stop(&mut self) {
        if self.status == ClockStatus::Running || self.status == ClockStatus::Idle {
            self.status = ClockStatus::Stopped;
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn duration_ticks(&self) -> u64 {
        self.duration_ticks
    }

    pub fn remaining_ticks(&self) -> u64 {
        self.duration_ticks.saturating_sub(self.current_tick)
    }

    pub fn status(&self) -> ClockStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == ClockStatus::Running
    }

    fn emit_current(&mut self) -> Vec<ClockEvent> {
        let mut events = vec![ClockEvent::Tick(self.current_tick)];
        if self.current_tick >= self.duration_ticks {
            self.status = ClockStatus::Ended;
            events.push(ClockEvent::Ended);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_to_duration_then_ends_once() {
        let mut clock = TimelineClock::new(3);
        assert_eq!(clock.start(), vec![ClockEvent::Tick(0)]);
        assert_eq!(clock.advance().unwrap(), vec![ClockEvent::Tick(1)]);
        assert_eq!(clock.advance().unwrap(), vec![ClockEvent::Tick(2)]);
        assert_eq!(clock.advance().unwrap(), vec![ClockEvent::Tick(3), ClockEvent::Ended]);
        assert_eq!(clock.status(), ClockStatus::Ended);
        assert_eq!(clock.advance(), Err(PlaybackError::ClockStopped));
        assert_eq!(clock.current_tick(), 3);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut clock = TimelineClock::new(10);
        clock.start();
        clock.advance().unwrap();
        clock.stop();
        clock.stop();
        assert_eq!(clock.status(), ClockStatus::Stopped);
        assert_eq!(clock.current_tick(), 1);
        assert!(clock.advance().is_err());
    }

    #[test]
    fn stop_after_end_keeps_ended() {
        let mut clock = TimelineClock::new(1);
        clock.start();
        clock.advance().unwrap();
        clock.stop();
        assert_eq!(clock.status(), ClockStatus::Ended);
    }

    #[test]
    fn restart_resets_counter() {
        let mut clock = TimelineClock::new(5);
        clock.start();
        clock.advance().unwrap();
        clock.advance().unwrap();
        clock.stop();
        assert_eq!(clock.start(), vec![ClockEvent::Tick(0)]);
        assert_eq!(clock.remaining_ticks(), 5);
    }
}
