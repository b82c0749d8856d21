use serde::{Deserialize, Serialize};

use crate::models::{PopupDefinition, DEFAULT_OFFER_DURATION_SECS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PopupPhase {
    Voting,
    ThankYou,
    Results,
    Shown,
    Closed,
}

impl PopupPhase {
    pub fn initial_for(definition: &PopupDefinition) -> Self {
        if definition.is_poll() {
            PopupPhase::Voting
        } else {
            PopupPhase::Shown
        }
    }

    pub fn is_terminal(self) -> bool {
        self == PopupPhase::Closed
    }

    /// Phase entered when the current one runs out of ticks.
    fn on_timeout(self) -> PopupPhase {
        match self {
            PopupPhase::Voting | PopupPhase::ThankYou => PopupPhase::Results,
            PopupPhase::Results | PopupPhase::Shown | PopupPhase::Closed => PopupPhase::Closed,
        }
    }
}

/// Phase lengths in ticks. The same rule applies whether or not a vote was cast:
/// voting and thank-you both lead into a results phase of fixed length.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimings {
    pub poll_voting_ticks: u64,
    pub poll_thank_you_ticks: u64,
    pub poll_results_ticks: u64,
    pub offer_default_ticks: u64,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            poll_voting_ticks: 15,
            poll_thank_you_ticks: 15,
            poll_results_ticks: 10,
            offer_default_ticks: DEFAULT_OFFER_DURATION_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VoteRejection {
    NoActivePoll,
    VotingClosed,
    UnknownOption,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum VoteOutcome {
    Accepted { option_index: usize },
    Rejected { reason: VoteRejection },
}

impl VoteOutcome {
    pub fn rejected(reason: VoteRejection) -> Self {
        VoteOutcome::Rejected { reason }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, VoteOutcome::Accepted { .. })
    }
}

/// Lifecycle of the popup currently on screen.
#[derive(Debug, Clone)]
pub struct PopupRuntimeState {
    pub definition: PopupDefinition,
    pub phase: PopupPhase,
    pub phase_entered_at_tick: u64,
    pub activated_at_tick: u64,
    pub selected_option: Option<usize>,
}

impl PopupRuntimeState {
    pub fn activate(definition: PopupDefinition, tick: u64) -> Self {
        Self {
            phase: PopupPhase::initial_for(&definition),
            definition,
            phase_entered_at_tick: tick,
            activated_at_tick: tick,
            selected_option: None,
        }
    }

    /// Ticks the current phase lasts; `None` once closed.
    pub fn phase_timeout(&self, timings: &PhaseTimings) -> Option<u64> {
        match self.phase {
            PopupPhase::Voting => Some(timings.poll_voting_ticks),
            PopupPhase::ThankYou => Some(timings.poll_thank_you_ticks),
            PopupPhase::Results => Some(timings.poll_results_ticks),
            PopupPhase::Shown => self.definition.offer_duration(timings.offer_default_ticks),
            PopupPhase::Closed => None,
        }
    }

    pub fn remaining_ticks(&self, tick: u64, timings: &PhaseTimings) -> Option<u64> {
        let elapsed = tick.saturating_sub(self.phase_entered_at_tick);
        self.phase_timeout(timings)
            .map(|timeout| timeout.saturating_sub(elapsed))
    }

    /// Applies every timeout that has expired by `tick` and returns the phases
    /// entered, in order. Zero-length phases chain within the same tick.
    pub fn advance(&mut self, tick: u64, timings: &PhaseTimings) -> Vec<PopupPhase> {
        let mut entered = Vec::new();
        while let Some(timeout) = self.phase_timeout(timings) {
            if tick.saturating_sub(self.phase_entered_at_tick) < timeout {
                break;
            }
            self.phase = self.phase.on_timeout();
            self.phase_entered_at_tick = tick;
            entered.push(self.phase);
        }
        entered
    }

    pub fn vote(&mut self, option_index: usize, tick: u64) -> VoteOutcome {
        if !self.definition.is_poll() {
            return VoteOutcome::rejected(VoteRejection::NoActivePoll);
        }
        if self.phase != PopupPhase::Voting {
            return VoteOutcome::rejected(VoteRejection::VotingClosed);
        }
        if option_index >= self.definition.option_count() {
            return VoteOutcome::rejected(VoteRejection::UnknownOption);
        }

        self.selected_option = Some(option_index);
        self.phase = PopupPhase::ThankYou;
        self.phase_entered_at_tick = tick;
        VoteOutcome::Accepted { option_index }
    }

    pub fn is_closed(&self) -> bool {
        self.phase.is_terminal()
    }
}
