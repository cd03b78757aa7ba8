use thiserror::Error;

/// Engine-internal faults. These never cross the wire directly — the session coordinator is the
/// only place that translates a game-level problem into a protocol error message.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GameError {
    #[error("action is not legal for the current actor")]
    InvalidAction,
    #[error("not enough chips for this action")]
    InsufficientChips,
    #[error("action submitted by a seat that is not the current actor")]
    WrongActor,
    #[error("no hand is in progress")]
    NoHandInProgress,
    #[error("seat not found")]
    SeatNotFound,
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}
