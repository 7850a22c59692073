//! Callback system for circuit breaker state transitions

use crate::State;
use std::sync::Arc;

/// Observer invoked with `(circuit name, from, to)`
pub type StateChangeFn = Arc<dyn Fn(&str, State, State) + Send + Sync>;

/// Hook invoked with the circuit name
pub type NamedHookFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Callbacks for circuit breaker events
///
/// Callbacks run while the breaker's lock is held. They must not call back
/// into the same breaker and should return quickly.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub on_state_change: Option<StateChangeFn>,
    pub on_open: Option<NamedHookFn>,
    pub on_close: Option<NamedHookFn>,
    pub on_half_open: Option<NamedHookFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify observers of a committed transition
    pub fn trigger(&self, circuit: &str, from: State, to: State) {
        if let Some(ref callback) = self.on_state_change {
            callback(circuit, from, to);
        }

        let hook = match to {
            State::Open => &self.on_open,
            State::Closed => &self.on_close,
            State::HalfOpen => &self.on_half_open,
        };
        if let Some(callback) = hook {
            callback(circuit);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_state_change", &self.on_state_change.is_some())
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_half_open", &self.on_half_open.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_trigger_runs_observer_then_hook() {
        let log = Arc::new(Mutex::new(Vec::new()));

        let observer_log = log.clone();
        let hook_log = log.clone();
        let callbacks = Callbacks {
            on_state_change: Some(Arc::new(move |name: &str, from: State, to: State| {
                observer_log.lock().push(format!("{name}: {from} -> {to}"));
            })),
            on_open: Some(Arc::new(move |name: &str| {
                hook_log.lock().push(format!("{name} opened"));
            })),
            ..Default::default()
        };

        callbacks.trigger("db", State::Closed, State::Open);
        callbacks.trigger("db", State::Open, State::HalfOpen);

        assert_eq!(
            *log.lock(),
            vec!["db: closed -> open", "db opened", "db: open -> half-open"]
        );
    }

    #[test]
    fn test_trigger_without_callbacks_is_noop() {
        Callbacks::new().trigger("db", State::HalfOpen, State::Closed);
    }
}
