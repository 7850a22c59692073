//! Error types for circuit breaker operations

use std::time::Duration;
use thiserror::Error;

/// Errors returned by [`CircuitBreaker::execute`](crate::CircuitBreaker::execute)
///
/// `Open` and `TooManyRequests` are produced by the breaker itself and mean the
/// wrapped operation was never called. `Execution` carries the operation's own
/// error untouched.
#[derive(Debug, Error)]
pub enum CircuitError<E = Box<dyn std::error::Error + Send + Sync>> {
    /// Circuit is open and the cooldown has not elapsed
    #[error("circuit '{circuit}' is open (retry in {retry_in:?})")]
    Open { circuit: String, retry_in: Duration },
    /// Circuit is half-open and its probe admission cap is reached
    #[error("circuit '{circuit}' is half-open: too many requests")]
    TooManyRequests { circuit: String },
    /// The wrapped operation failed
    #[error(transparent)]
    Execution(E),
}

impl<E> CircuitError<E> {
    /// True when the breaker refused the call without running it
    pub fn is_rejection(&self) -> bool {
        !matches!(self, CircuitError::Execution(_))
    }

    /// Recover the wrapped operation's error, if that is what this is
    pub fn into_execution(self) -> Option<E> {
        match self {
            CircuitError::Execution(e) => Some(e),
            _ => None,
        }
    }
}

/// Raised when a raw discriminant does not name a [`State`](crate::State)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("undefined state: {0}")]
pub struct UndefinedState(pub u8);
