//! Builder API for ergonomic circuit breaker configuration

use crate::{
    Counts, State,
    callbacks::Callbacks,
    circuit::{CircuitBreaker, CircuitContext, Config},
    clock::{Clock, MonotonicClock},
    policy::{ConsecutiveFailures, PredicatePolicy, TripPolicy},
};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating circuit breakers with fluent API
pub struct CircuitBuilder {
    name: String,
    config: Config,
    policy: Option<Arc<dyn TripPolicy>>,
    clock: Option<Arc<dyn Clock>>,
    callbacks: Callbacks,
}

impl CircuitBuilder {
    /// Create a new builder for a circuit with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            policy: None,
            clock: None,
            callbacks: Callbacks::new(),
        }
    }

    /// Set the half-open probe limit, which is also the number of consecutive
    /// half-open successes needed to close the circuit
    ///
    /// Defaults to 0, which leaves a tripped circuit locked out for good.
    pub fn request_threshold(mut self, threshold: u32) -> Self {
        self.config.request_threshold = threshold;
        self
    }

    /// Set how long the circuit stays open (zero means the 60s default)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the jitter factor (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: timeout * (1 - jitter + rand * jitter)
    pub fn jitter_factor(mut self, factor: f64) -> Self {
        self.config.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    /// Decide when a closed circuit trips, from the counts since the last reset
    ///
    /// Called after every failure while closed. Without one, the circuit trips
    /// when consecutive failures exceed 5.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use circuit_guard::CircuitBreaker;
    ///
    /// let circuit = CircuitBreaker::builder("search")
    ///     .ready_to_trip(|counts| counts.requests >= 3 && counts.failure_rate() >= 0.6)
    ///     .build();
    /// ```
    pub fn ready_to_trip<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Counts) -> bool + Send + Sync + 'static,
    {
        self.policy = Some(Arc::new(PredicatePolicy::new(predicate)));
        self
    }

    /// Set a trip policy object
    pub fn trip_policy(mut self, policy: Arc<dyn TripPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Set the time source (defaults to the monotonic clock)
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set callback for every state transition, called with `(name, from, to)`
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, State, State) + Send + Sync + 'static,
    {
        self.callbacks.on_state_change = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit opens
    pub fn on_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_open = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit closes
    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_close = Some(Arc::new(f));
        self
    }

    /// Set callback for when circuit enters half-open
    pub fn on_half_open<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.callbacks.on_half_open = Some(Arc::new(f));
        self
    }

    /// Build the circuit breaker
    pub fn build(self) -> CircuitBreaker {
        let context = CircuitContext {
            name: self.name,
            config: self.config,
            policy: self
                .policy
                .unwrap_or_else(|| Arc::new(ConsecutiveFailures::default())),
            clock: self.clock.unwrap_or_else(|| Arc::new(MonotonicClock)),
        };

        CircuitBreaker::with_context_and_callbacks(context, self.callbacks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CircuitError, FailureRate, ManualClock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_builder_defaults() {
        let circuit = CircuitBuilder::new("test").build();

        assert_eq!(circuit.state(), State::Closed);
        assert_eq!(circuit.config().request_threshold, 0);
        assert_eq!(circuit.config().timeout, Duration::from_secs(60));
        assert_eq!(circuit.config().jitter_factor, 0.0);
    }

    #[test]
    fn test_builder_custom_config() {
        let circuit = CircuitBuilder::new("test")
            .request_threshold(3)
            .timeout(Duration::from_secs(5))
            .jitter_factor(1.5)
            .build();

        assert!(circuit.is_closed());
        assert_eq!(circuit.config().request_threshold, 3);
        assert_eq!(circuit.config().timeout, Duration::from_secs(5));
        assert_eq!(circuit.config().jitter_factor, 1.0);
    }

    #[test]
    fn test_builder_with_callbacks() {
        let opened = Arc::new(AtomicUsize::new(0));
        let half_opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::new());

        let (o, h, c) = (opened.clone(), half_opened.clone(), closed.clone());
        let circuit = CircuitBuilder::new("test")
            .request_threshold(1)
            .clock(clock.clone())
            .ready_to_trip(|counts| counts.consecutive_failures >= 2)
            .on_open(move |_name| {
                o.fetch_add(1, Ordering::SeqCst);
            })
            .on_half_open(move |_name| {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .on_close(move |_name| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .build();

        let _ = circuit.execute(|| Err::<(), _>("error 1"));
        let _ = circuit.execute(|| Err::<(), _>("error 2"));
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(60));
        let _ = circuit.execute(|| Ok::<_, &str>(()));

        assert_eq!(half_opened.load(Ordering::SeqCst), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(circuit.is_closed());
    }

    #[test]
    fn test_builder_with_trip_policy() {
        let circuit = CircuitBuilder::new("test")
            .trip_policy(Arc::new(FailureRate::new(0.5, 4)))
            .build();

        let _ = circuit.execute(|| Err::<(), _>("error"));
        let _ = circuit.execute(|| Err::<(), _>("error"));
        let _ = circuit.execute(|| Ok::<_, &str>(()));
        assert!(circuit.is_closed(), "below minimum requests");

        let result = circuit.execute(|| Err::<(), _>("error"));
        assert!(matches!(result, Err(CircuitError::Execution("error"))));
        assert!(circuit.is_open());
    }
}
