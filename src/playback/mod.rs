pub mod clock;
pub mod commands;
pub mod controller;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod validation;

pub use clock::{ClockEvent, ClockStatus, TimelineClock};
pub use controller::SessionController;
pub use error::{PlaybackError, Result};
pub use scheduler::{PopupScheduler, SchedulerEvent};
pub use session::{ActivePopupView, PlaybackEvent, PlaybackSession, PlaybackStatus, SessionSnapshot};
pub use state::{PhaseTimings, PopupPhase, PopupRuntimeState, VoteOutcome, VoteRejection};
pub use validation::{validate_popups, DroppedPopup, ValidatedPopups};
