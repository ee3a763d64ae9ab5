//! Reconnect backoff and circuit breaker (§4.9 "Reconnection").

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use parking_lot::Mutex;
use std::time::Duration;

/// External collaborator the [`crate::manager::TunnelManager`] reconnect
/// loop consults after every dial failure (§4.9, §6 "Consumed from external
/// collaborators").
pub trait Reconnector: Send + Sync {
    /// Whether another attempt should be made at all.
    fn should_retry(&self) -> bool;
    /// Whether the circuit breaker has tripped; the reconnect loop exits while this holds.
    fn is_circuit_open(&self) -> bool;
    /// Delay before the next attempt, or `None` if backoff is exhausted.
    fn next_delay(&self) -> Option<Duration>;
    /// Reset failure bookkeeping and close the circuit after a successful reconnect.
    fn record_success(&self);
    /// Record a failed attempt.
    fn record_failure(&self);
    /// Attempts since the last success.
    fn get_attempts(&self) -> u32;
}

struct State {
    backoff: ExponentialBackoff,
    attempts: u32,
    consecutive_failures: u32,
    circuit_open: bool,
}

/// [`backoff::ExponentialBackoff`] plus a trip-after-N-consecutive-failures
/// circuit breaker. `circuit_breaker_threshold` of `0` disables the breaker.
pub struct BackoffReconnector {
    state: Mutex<State>,
    circuit_breaker_threshold: u32,
}

impl BackoffReconnector {
    /// Build a reconnector that trips its circuit after `circuit_breaker_threshold`
    /// consecutive failures (default-configured exponential backoff between attempts).
    pub fn new(circuit_breaker_threshold: u32) -> Self {
        Self {
            state: Mutex::new(State {
                backoff: ExponentialBackoff::default(),
                attempts: 0,
                consecutive_failures: 0,
                circuit_open: false,
            }),
            circuit_breaker_threshold,
        }
    }
}

impl Default for BackoffReconnector {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Reconnector for BackoffReconnector {
    fn should_retry(&self) -> bool {
        !self.state.lock().circuit_open
    }

    fn is_circuit_open(&self) -> bool {
        self.state.lock().circuit_open
    }

    fn next_delay(&self) -> Option<Duration> {
        self.state.lock().backoff.next_backoff()
    }

    fn record_success(&self) {
        let mut state = self.state.lock();
        state.backoff.reset();
        state.attempts = 0;
        state.consecutive_failures = 0;
        state.circuit_open = false;
    }

    fn record_failure(&self) {
        let mut state = self.state.lock();
        state.attempts += 1;
        state.consecutive_failures += 1;
        if self.circuit_breaker_threshold > 0 && state.consecutive_failures >= self.circuit_breaker_threshold {
            state.circuit_open = true;
        }
    }

    fn get_attempts(&self) -> u32 {
        self.state.lock().attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_resets_attempts_and_closes_circuit() {
        let r = BackoffReconnector::new(3);
        r.record_failure();
        r.record_failure();
        r.record_success();
        assert_eq!(r.get_attempts(), 0);
        assert!(!r.is_circuit_open());
    }

    #[test]
    fn circuit_opens_after_threshold_consecutive_failures() {
        let r = BackoffReconnector::new(3);
        r.record_failure();
        r.record_failure();
        assert!(!r.is_circuit_open());
        r.record_failure();
        assert!(r.is_circuit_open());
        assert!(!r.should_retry());
    }

    #[test]
    fn zero_threshold_disables_the_breaker() {
        let r = BackoffReconnector::new(0);
        for _ in 0..50 {
            r.record_failure();
        }
        assert!(!r.is_circuit_open());
        assert!(r.should_retry());
    }
}
