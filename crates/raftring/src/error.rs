//! Error kinds surfaced by the consumer-blocking operations:
//! `thiserror`-derived enums, plain data, `#[error("...")]` messages, no
//! `dyn Error` boxing, no panics on a recoverable path.

use thiserror::Error;

/// Raised by `pop` / `peek` / `signal_pop` when the port has been
/// invalidated and the queue is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("port closed: queue is empty and will receive no further items")]
pub struct ClosedPortAccessError;

/// Raised by `peek_range(n)` when the port has been invalidated. A single
/// enum lets callers still distinguish "nothing left" from "not enough
/// left".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PeekRangeError {
    /// The port is invalidated and the queue is completely empty.
    #[error("port closed: queue is empty and will receive no further items")]
    ClosedEmpty,
    /// The port is invalidated and fewer than the requested `n` items
    /// remain.
    #[error("port closed: only {available} of {requested} requested items remain")]
    ClosedShort {
        /// Items actually available when the port closed.
        available: u32,
        /// Items requested by the caller.
        requested: u32,
    },
}

impl From<ClosedPortAccessError> for PeekRangeError {
    fn from(_: ClosedPortAccessError) -> Self {
        PeekRangeError::ClosedEmpty
    }
}
