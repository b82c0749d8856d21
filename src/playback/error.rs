use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlaybackError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Invalid session config: {0}")]
    InvalidSessionConfig(String),

    #[error("Tick out of order: expected {expected}, got {got}")]
    TickOutOfOrder { expected: u64, got: u64 },

    #[error("A playback session is already active")]
    SessionAlreadyActive,

    #[error("Clock is not running")]
    ClockStopped,
}
