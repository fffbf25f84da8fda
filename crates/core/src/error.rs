use crate::types::HorseId;

/// Domain errors from race state transitions.
///
/// The store absorbs these (an unknown horse or a replayed answer is a
/// logged no-op), so they never reach an HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Horse not found: {0}")]
    HorseNotFound(HorseId),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// A client-supplied field that failed validation. The message is safe to
/// return to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);
