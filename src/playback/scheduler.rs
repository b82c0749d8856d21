use std::collections::BTreeMap;

use crate::models::PopupDefinition;

use super::error::{PlaybackError, Result};
use super::state::{PhaseTimings, PopupPhase, PopupRuntimeState, VoteOutcome, VoteRejection};

// Per-tick activation chatter; flip off when tracing something else.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    Activated(PopupDefinition),
    PhaseChanged(PopupPhase),
    Deactivated,
}

/// Decides which popup is on screen at each tick and drives its phases.
///
/// Activation is an exact match on the tick. A definition whose time passes
/// while another popup is active, or that loses a same-tick tie to an earlier
/// entry in list order, is skipped for the rest of the session.
#[derive(Debug)]
pub struct PopupScheduler {
    definitions: Vec<PopupDefinition>,
    /// Definition indices keyed by activation tick, list order preserved.
    pending: BTreeMap<u64, Vec<usize>>,
    active: Option<PopupRuntimeState>,
    last_tick: Option<u64>,
    timings: PhaseTimings,
}

impl PopupScheduler {
    pub fn new(definitions: Vec<PopupDefinition>, timings: PhaseTimings) -> Self {
        let mut pending: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (index, definition) in definitions.iter().enumerate() {
            pending
                .entry(definition.activation_time_seconds)
                .or_default()
                .push(index);
        }

        Self {
            definitions,
            pending,
            active: None,
            last_tick: None,
            timings,
        }
    }

    /// Ticks must arrive as 0, 1, 2, ... Anything else is refused and leaves
    /// the scheduler untouched.
    pub fn on_tick(&mut self, tick: u64) -> Result<Vec<SchedulerEvent>> {
        let expected = self.last_tick.map_or(0, |last| last + 1);
        if tick != expected {
            return Err(PlaybackError::TickOutOfOrder {
                expected,
                got: tick,
            });
        }
        self.last_tick = Some(tick);

        let mut events = Vec::new();
        self.advance_active(tick, &mut events);

        if let Some(due) = self.pending.remove(&tick) {
            let mut due = due.into_iter();
            if self.active.is_none() {
                if let Some(index) = due.next() {
                    let definition = self.definitions[index].clone();
                    log_info!(
                        "Activating {} popup #{index} at tick {tick}",
                        definition.kind()
                    );
                    self.active = Some(PopupRuntimeState::activate(definition.clone(), tick));
                    events.push(SchedulerEvent::Activated(definition));
                    self.advance_active(tick, &mut events);
                }
            }
            for skipped in due {
                log_warn!("Skipping popup #{skipped} at tick {tick}: another popup holds the slot");
            }
        }

        Ok(events)
    }

    /// Records a vote against the active poll at the last processed tick.
    pub fn cast_vote(&mut self, option_index: usize) -> VoteOutcome {
        let tick = self.last_tick.unwrap_or(0);
        match self.active.as_mut() {
            Some(active) => {
                let outcome = active.vote(option_index, tick);
                log_debug!("Vote for option {option_index} at tick {tick}: {outcome:?}");
                outcome
            }
            None => VoteOutcome::rejected(VoteRejection::NoActivePoll),
        }
    }

    /// Drops the active popup, if any. Returns whether one was dropped.
    pub fn clear(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn active(&self) -> Option<&PopupRuntimeState> {
        self.active.as_ref()
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    /// Definitions that can still fire.
    pub fn pending_count(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    fn advance_active(&mut self, tick: u64, events: &mut Vec<SchedulerEvent>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        for phase in active.advance(tick, &self.timings) {
            if phase.is_terminal() {
                events.push(SchedulerEvent::Deactivated);
            } else {
                events.push(SchedulerEvent::PhaseChanged(phase));
            }
        }

        if active.is_closed() {
            log_debug!("Popup closed at tick {tick}");
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until(scheduler: &mut PopupScheduler, last: u64) -> Vec<(u64, SchedulerEvent)> {
        let start = scheduler.last_tick().map_or(0, |t| t + 1);
        let mut out = Vec::new();
        for tick in start..=last {
            for event in scheduler.on_tick(tick).unwrap() {
                out.push((tick, event));
            }
        }
        out
    }

    #[test]
    fn activates_on_exact_tick() {
        let poll = PopupDefinition::poll(5, &["A", "B"]);
        let mut scheduler = PopupScheduler::new(vec![poll.clone()], PhaseTimings::default());

        let events = run_until(&mut scheduler, 30);
        assert_eq!(
            events,
            vec![
                (5, SchedulerEvent::Activated(poll)),
                (20, SchedulerEvent::PhaseChanged(PopupPhase::Results)),
                (30, SchedulerEvent::Deactivated),
            ]
        );
        assert!(scheduler.active().is_none());
    }

    #[test]
    fn same_tick_conflict_first_in_list_wins() {
        let first = PopupDefinition::offer(10, "first.png");
        let second = PopupDefinition::offer(10, "second.png");
        let mut scheduler = PopupScheduler::new(vec![first.clone(), second], PhaseTimings::default());

        let activations: Vec<_> = run_until(&mut scheduler, 100)
            .into_iter()
            .filter(|(_, e)| matches!(e, SchedulerEvent::Activated(_)))
            .collect();
        assert_eq!(activations, vec![(10, SchedulerEvent::Activated(first))]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn popup_due_while_slot_taken_is_skipped() {
        let offer = PopupDefinition::offer(0, "banner.png");
        let late_poll = PopupDefinition::poll(5, &["Yes", "No"]);
        let mut scheduler = PopupScheduler::new(vec![offer, late_poll], PhaseTimings::default());

        let events = run_until(&mut scheduler, 60);
        let activations = events
            .iter()
            .filter(|(_, e)| matches!(e, SchedulerEvent::Activated(_)))
            .count();
        assert_eq!(activations, 1);
    }

    #[test]
    fn slot_freed_on_close_tick_can_be_reused() {
        let offer = PopupDefinition::offer(0, "banner.png");
        let poll = PopupDefinition::poll(20, &["Yes", "No"]);
        let mut scheduler = PopupScheduler::new(vec![offer, poll.clone()], PhaseTimings::default());

        let events = run_until(&mut scheduler, 20);
        assert_eq!(
            &events[events.len() - 2..],
            &[(20, SchedulerEvent::Deactivated), (20, SchedulerEvent::Activated(poll))]
        );
    }

    #[test]
    fn rejects_out_of_order_ticks_without_side_effects() {
        let mut scheduler =
            PopupScheduler::new(vec![PopupDefinition::poll(1, &["A"])], PhaseTimings::default());

        assert_eq!(
            scheduler.on_tick(1),
            Err(PlaybackError::TickOutOfOrder { expected: 0, got: 1 })
        );
        scheduler.on_tick(0).unwrap();
        assert_eq!(
            scheduler.on_tick(0),
            Err(PlaybackError::TickOutOfOrder { expected: 1, got: 0 })
        );
        assert_eq!(scheduler.last_tick(), Some(0));
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn vote_applies_to_active_poll_only() {
        let mut scheduler =
            PopupScheduler::new(vec![PopupDefinition::poll(2, &["A", "B"])], PhaseTimings::default());

        run_until(&mut scheduler, 1);
        assert_eq!(
            scheduler.cast_vote(0),
            VoteOutcome::rejected(VoteRejection::NoActivePoll)
        );

        run_until(&mut scheduler, 4);
        assert!(scheduler.cast_vote(0).is_accepted());
        assert_eq!(scheduler.active().map(|a| a.phase), Some(PopupPhase::ThankYou));
        assert_eq!(scheduler.active().map(|a| a.phase_entered_at_tick), Some(4));
    }

    #[test]
    fn zero_duration_offer_activates_and_closes_same_tick() {
        let mut offer = PopupDefinition::offer(3, "flash.png");
        if let crate::models::PopupVariant::Offer {
            duration_seconds, ..
        } = &mut offer.variant
        {
            *duration_seconds = Some(0);
        }
        let mut scheduler = PopupScheduler::new(vec![offer.clone()], PhaseTimings::default());

        let events = run_until(&mut scheduler, 3);
        assert_eq!(
            events,
            vec![(3, SchedulerEvent::Activated(offer)), (3, SchedulerEvent::Deactivated)]
        );
    }
}
