//! Outcome counters tracked since the last state transition

/// Request and outcome counts since the circuit last changed state
///
/// Invariants: `total_successes + total_failures == requests`, and at most one
/// of the two consecutive streaks is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Counts {
    /// Calls admitted since the last reset
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    /// Length of the current success streak
    pub consecutive_successes: u32,
    /// Length of the current failure streak
    pub consecutive_failures: u32,
}

impl Counts {
    pub(crate) fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn reset(&mut self) {
        *self = Counts::default();
    }

    /// Fraction of admitted calls that failed, 0.0 when nothing was admitted
    pub fn failure_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            f64::from(self.total_failures) / f64::from(self.requests)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_break_opposite_streak() {
        let mut counts = Counts::default();

        for _ in 0..3 {
            counts.on_request();
            counts.on_failure();
        }
        assert_eq!(counts.consecutive_failures, 3);
        assert_eq!(counts.consecutive_successes, 0);

        counts.on_request();
        counts.on_success();
        assert_eq!(counts.consecutive_failures, 0);
        assert_eq!(counts.consecutive_successes, 1);
        assert_eq!(counts.total_failures, 3);
        assert_eq!(counts.total_successes, 1);
        assert_eq!(
            counts.total_successes + counts.total_failures,
            counts.requests
        );
    }

    #[test]
    fn test_reset_zeroes_everything() {
        let mut counts = Counts::default();
        counts.on_request();
        counts.on_failure();
        counts.on_request();
        counts.on_success();

        counts.reset();
        assert_eq!(counts, Counts::default());
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let mut counts = Counts {
            requests: u32::MAX,
            total_failures: u32::MAX,
            consecutive_failures: u32::MAX,
            ..Default::default()
        };

        counts.on_request();
        counts.on_failure();
        assert_eq!(counts.requests, u32::MAX);
        assert_eq!(counts.consecutive_failures, u32::MAX);
    }

    #[test]
    fn test_failure_rate() {
        let mut counts = Counts::default();
        assert_eq!(counts.failure_rate(), 0.0);

        for i in 0..4 {
            counts.on_request();
            if i % 2 == 0 {
                counts.on_failure();
            } else {
                counts.on_success();
            }
        }
        assert_eq!(counts.failure_rate(), 0.5);
    }
}
