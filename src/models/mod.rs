pub mod popup;
pub mod video;

pub use popup::{PollResult, PopupDefinition, PopupVariant, DEFAULT_OFFER_DURATION_SECS};
pub use video::VideoSession;
