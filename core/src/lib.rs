//! Circuit Guard - a three-state circuit breaker for unreliable dependencies
//!
//! This crate wraps calls to a fallible downstream operation and:
//! - Tracks outcome counts since the last state change
//! - Trips to `Open` when a caller-supplied policy says so
//! - Rejects calls during a cooldown, then probes recovery in `HalfOpen`
//! - Serializes all callers behind a single lock, so it is safe to share
//!
//! # Example
//!
//! ```rust
//! use circuit_guard::{CircuitBreaker, CircuitError};
//! use std::time::Duration;
//!
//! let circuit = CircuitBreaker::builder("inventory_api")
//!     .request_threshold(2)
//!     .timeout(Duration::from_secs(30))
//!     .ready_to_trip(|counts| counts.consecutive_failures >= 3)
//!     .on_state_change(|name, from, to| println!("{name}: {from} -> {to}"))
//!     .build();
//!
//! match circuit.execute(|| Ok::<_, String>("in stock")) {
//!     Ok(value) => println!("got {value}"),
//!     Err(CircuitError::Execution(e)) => println!("dependency failed: {e}"),
//!     Err(rejected) => println!("not called: {rejected}"),
//! }
//! ```

pub mod builder;
pub mod callbacks;
pub mod circuit;
pub mod clock;
pub mod counts;
pub mod errors;
pub mod policy;

pub use builder::CircuitBuilder;
pub use circuit::{CircuitBreaker, Config};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use counts::Counts;
pub use errors::{CircuitError, UndefinedState};
pub use policy::{ConsecutiveFailures, FailureRate, PredicatePolicy, TripPolicy};

use std::fmt;

/// Lifecycle state of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    /// Normal operation, every call is forwarded
    Closed = 0,
    /// Tripped, calls are rejected until the cooldown elapses
    Open = 1,
    /// Probing, a limited number of calls are forwarded
    HalfOpen = 2,
}

impl State {
    /// Text form used in logs and `Display`
    pub fn as_str(self) -> &'static str {
        match self {
            State::Closed => "closed",
            State::Open => "open",
            State::HalfOpen => "half-open",
        }
    }

    pub(crate) fn from_machine(name: &str) -> Self {
        match name {
            "Closed" => State::Closed,
            "Open" => State::Open,
            "HalfOpen" => State::HalfOpen,
            other => unreachable!("undefined state: {other}"),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for State {
    type Error = UndefinedState;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(State::Closed),
            1 => Ok(State::Open),
            2 => Ok(State::HalfOpen),
            other => Err(UndefinedState(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(State::Closed.to_string(), "closed");
        assert_eq!(State::HalfOpen.to_string(), "half-open");
        assert_eq!(State::Open.to_string(), "open");
    }

    #[test]
    fn test_state_from_discriminant() {
        assert_eq!(State::try_from(0), Ok(State::Closed));
        assert_eq!(State::try_from(1), Ok(State::Open));
        assert_eq!(State::try_from(2), Ok(State::HalfOpen));

        let err = State::try_from(100).unwrap_err();
        assert_eq!(err.to_string(), "undefined state: 100");
    }
}
