//! Circuit breaker implementation using state machines
//!
//! The lifecycle is a `state_machine!` in dynamic mode. The machine owns the
//! cooldown deadline (as `Open` state data) and enforces which transitions are
//! legal. [`CircuitBreaker`] owns the outcome counters and decides when to
//! fire each event.

use crate::{
    Counts, State, callbacks::Callbacks, clock::Clock, clock::MonotonicClock,
    errors::CircuitError, policy::ConsecutiveFailures, policy::TripPolicy,
};
use parking_lot::Mutex;
use state_machines::state_machine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Cooldown used when none (or zero) is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum calls admitted while `HalfOpen`, and the number of consecutive
    /// successes in `HalfOpen` needed to close again.
    ///
    /// Zero is honoured literally: a half-open circuit then admits nothing and
    /// never recovers on its own.
    pub request_threshold: u32,

    /// How long the circuit stays `Open` before the next call may probe
    pub timeout: Duration,

    /// Jitter factor for the cooldown (0.0 = no jitter, 1.0 = full jitter)
    /// Uses chrono-machines formula: timeout * (1 - jitter + rand * jitter)
    pub jitter_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_threshold: 0,
            timeout: DEFAULT_TIMEOUT,
            jitter_factor: 0.0,
        }
    }
}

/// Circuit breaker context - shared data across all states
#[derive(Clone)]
pub struct CircuitContext {
    pub name: String,
    pub config: Config,
    pub policy: Arc<dyn TripPolicy>,
    pub clock: Arc<dyn Clock>,
}

impl Default for CircuitContext {
    fn default() -> Self {
        Self {
            name: String::new(),
            config: Config::default(),
            policy: Arc::new(ConsecutiveFailures::default()),
            clock: Arc::new(MonotonicClock),
        }
    }
}

impl std::fmt::Debug for CircuitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitContext")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("policy", &self.policy)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Data specific to the Open state
#[derive(Debug, Clone, Default)]
pub struct OpenData {
    /// End of the cooldown; set right after the circuit trips
    pub until: Option<Instant>,
}

state_machine! {
    name: Circuit,
    context: CircuitContext,
    dynamic: true,

    initial: Closed,
    states: [
        Closed,
        Open(OpenData),
        HalfOpen,
    ],
    events {
        trip {
            transition: { from: [Closed, HalfOpen], to: Open }
        }
        attempt_reset {
            guards: [cooldown_elapsed],
            transition: { from: Open, to: HalfOpen }
        }
        close {
            transition: { from: HalfOpen, to: Closed }
        }
    }
}

impl Circuit<Open> {
    /// Check if the cooldown has elapsed for Open -> HalfOpen transition
    fn cooldown_elapsed(&self, ctx: &CircuitContext) -> bool {
        let data = self.state_data_open().expect("Open state must have data");
        match data.until {
            Some(until) => ctx.clock.now() >= until,
            None => true,
        }
    }
}

/// Mutable state, only touched with the breaker's lock held
struct Inner {
    machine: DynamicCircuit,
    counts: Counts,
}

impl Inner {
    fn state(&self) -> State {
        State::from_machine(self.machine.current_state())
    }
}

/// Circuit breaker public API
///
/// All calls are serialized: the lock is held for the whole of
/// [`execute`](Self::execute), including the wrapped operation. Share the
/// breaker between threads with an `Arc`.
pub struct CircuitBreaker {
    context: CircuitContext,
    callbacks: Callbacks,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the default trip policy
    /// (use builder() for more options)
    pub fn new(name: impl Into<String>, config: Config) -> Self {
        let context = CircuitContext {
            name: name.into(),
            config,
            ..Default::default()
        };

        Self::with_context_and_callbacks(context, Callbacks::new())
    }

    /// Create a circuit breaker with custom context and callbacks (used by builder)
    pub(crate) fn with_context_and_callbacks(
        mut context: CircuitContext,
        callbacks: Callbacks,
    ) -> Self {
        if context.config.timeout.is_zero() {
            context.config.timeout = DEFAULT_TIMEOUT;
        }
        if context.config.request_threshold == 0 {
            warn!(
                circuit = %context.name,
                "request_threshold is 0: once tripped, this circuit will never admit a probe"
            );
        }

        let machine = DynamicCircuit::new(context.clone());

        Self {
            context,
            callbacks,
            inner: Mutex::new(Inner {
                machine,
                counts: Counts::default(),
            }),
        }
    }

    /// Create a new circuit breaker builder
    pub fn builder(name: impl Into<String>) -> crate::builder::CircuitBuilder {
        crate::builder::CircuitBuilder::new(name)
    }

    /// Execute a fallible operation with circuit breaker protection
    ///
    /// The operation runs at most once. Its error comes back unchanged as
    /// [`CircuitError::Execution`]; the other variants mean it was not run.
    pub fn execute<T, E, F>(&self, operation: F) -> Result<T, CircuitError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut inner = self.inner.lock();

        // Lazy Open -> HalfOpen; the machine guard checks the deadline
        if inner.state() == State::Open {
            self.set_state(&mut inner, State::HalfOpen);
        }

        let admitted = match inner.state() {
            State::Open => {
                let retry_in = inner
                    .machine
                    .open_data()
                    .and_then(|d| d.until)
                    .map(|until| until.saturating_duration_since(self.context.clock.now()))
                    .unwrap_or_default();
                trace!(circuit = %self.context.name, ?retry_in, "rejected: circuit open");
                return Err(CircuitError::Open {
                    circuit: self.context.name.clone(),
                    retry_in,
                });
            }
            State::HalfOpen if inner.counts.requests >= self.context.config.request_threshold => {
                trace!(circuit = %self.context.name, "rejected: half-open probe limit reached");
                return Err(CircuitError::TooManyRequests {
                    circuit: self.context.name.clone(),
                });
            }
            state => state,
        };
        inner.counts.on_request();

        match operation() {
            Ok(value) => {
                self.on_success(&mut inner, admitted);
                Ok(value)
            }
            Err(e) => {
                self.on_failure(&mut inner, admitted);
                Err(CircuitError::Execution(e))
            }
        }
    }

    fn on_success(&self, inner: &mut Inner, admitted: State) {
        inner.counts.on_success();

        if admitted == State::HalfOpen
            && inner.counts.consecutive_successes >= self.context.config.request_threshold
        {
            self.set_state(inner, State::Closed);
        }
    }

    fn on_failure(&self, inner: &mut Inner, admitted: State) {
        match admitted {
            State::Closed => {
                inner.counts.on_failure();
                if self.context.policy.ready_to_trip(&inner.counts) {
                    self.set_state(inner, State::Open);
                }
            }
            State::HalfOpen => self.set_state(inner, State::Open),
            State::Open => {}
        }
    }

    /// Commit a transition: fire the machine event, reset counts, notify.
    ///
    /// Setting the current state again does nothing.
    fn set_state(&self, inner: &mut Inner, to: State) {
        let from = inner.state();
        if from == to {
            return;
        }

        let event = match to {
            State::Open => CircuitEvent::Trip,
            State::HalfOpen => CircuitEvent::AttemptReset,
            State::Closed => CircuitEvent::Close,
        };
        if inner.machine.handle(event).is_err() {
            return;
        }

        let name = &self.context.name;
        match to {
            State::Open => {
                let cooldown = self.cooldown();
                let until = self.deadline_after(cooldown);
                if let Some(data) = inner.machine.open_data_mut() {
                    data.until = Some(until);
                }
                warn!(circuit = %name, %from, counts = ?inner.counts, ?cooldown, "circuit opened");
            }
            State::HalfOpen => debug!(circuit = %name, "circuit half-open, probing"),
            State::Closed => info!(circuit = %name, "circuit closed"),
        }

        inner.counts.reset();
        self.callbacks.trigger(name, from, to);
    }

    /// Cooldown for the next Open period, with jitter if configured
    fn cooldown(&self) -> Duration {
        let config = &self.context.config;
        if config.jitter_factor > 0.0 {
            let timeout_ms = u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX);
            let policy = chrono_machines::Policy {
                max_attempts: 1,
                base_delay_ms: timeout_ms,
                multiplier: 1.0,
                max_delay_ms: timeout_ms,
            };
            Duration::from_millis(policy.calculate_delay(1, config.jitter_factor) as u64)
        } else {
            config.timeout
        }
    }

    fn deadline_after(&self, cooldown: Duration) -> Instant {
        let now = self.context.clock.now();
        now.checked_add(cooldown)
            .unwrap_or_else(|| now + Duration::from_secs(u64::from(u32::MAX)))
    }

    /// Circuit name, as passed to callbacks
    pub fn name(&self) -> &str {
        &self.context.name
    }

    /// Effective configuration (zero timeout already replaced by the default)
    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Current state
    ///
    /// This does not evaluate the cooldown: an open circuit reports `Open`
    /// until the next call, even past its deadline.
    pub fn state(&self) -> State {
        self.inner.lock().state()
    }

    /// Snapshot of the counters since the last transition
    pub fn counts(&self) -> Counts {
        self.inner.lock().counts
    }

    /// End of the current cooldown, `None` unless the circuit is open
    pub fn cooldown_deadline(&self) -> Option<Instant> {
        self.inner.lock().machine.open_data().and_then(|d| d.until)
    }

    /// Check if circuit is open
    pub fn is_open(&self) -> bool {
        self.state() == State::Open
    }

    /// Check if circuit is closed
    pub fn is_closed(&self) -> bool {
        self.state() == State::Closed
    }

    /// Check if circuit is half-open
    pub fn is_half_open(&self) -> bool {
        self.state() == State::HalfOpen
    }
}
