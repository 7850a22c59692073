//! Trip policies - decide when a closed circuit should open
//!
//! A policy is consulted only after a failure while the circuit is `Closed`.
//! A failure while `HalfOpen` always re-opens the circuit and never reaches
//! the policy.

use crate::Counts;

/// Trait for deciding whether a closed circuit should trip
///
/// # Examples
///
/// ```rust
/// use circuit_guard::{Counts, TripPolicy};
///
/// #[derive(Debug)]
/// struct AnyFailure;
///
/// impl TripPolicy for AnyFailure {
///     fn ready_to_trip(&self, counts: &Counts) -> bool {
///         counts.total_failures > 0
///     }
/// }
/// ```
pub trait TripPolicy: Send + Sync + std::fmt::Debug {
    /// Returns `true` if the circuit should move to `Open`
    fn ready_to_trip(&self, counts: &Counts) -> bool;
}

/// Trips once the failure streak is longer than `threshold`
///
/// The default threshold is 5, so the circuit opens on the sixth failure in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveFailures {
    pub threshold: u32,
}

impl ConsecutiveFailures {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }
}

impl Default for ConsecutiveFailures {
    fn default() -> Self {
        Self { threshold: 5 }
    }
}

impl TripPolicy for ConsecutiveFailures {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.consecutive_failures > self.threshold
    }
}

/// Trips when the failure rate since the last reset reaches `rate`
///
/// The rate is only evaluated once `minimum_requests` calls were admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRate {
    rate: f64,
    minimum_requests: u32,
}

impl FailureRate {
    /// `rate` is clamped to 0.0-1.0
    pub fn new(rate: f64, minimum_requests: u32) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            minimum_requests,
        }
    }
}

impl TripPolicy for FailureRate {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.requests >= self.minimum_requests && counts.failure_rate() >= self.rate
    }
}

/// Predicate-based policy using a closure
pub struct PredicatePolicy<F>
where
    F: Fn(&Counts) -> bool + Send + Sync,
{
    predicate: F,
}

impl<F> PredicatePolicy<F>
where
    F: Fn(&Counts) -> bool + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> TripPolicy for PredicatePolicy<F>
where
    F: Fn(&Counts) -> bool + Send + Sync,
{
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        (self.predicate)(counts)
    }
}

impl<F> std::fmt::Debug for PredicatePolicy<F>
where
    F: Fn(&Counts) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicatePolicy")
            .field("predicate", &"<closure>")
            .finish()
    }
}
