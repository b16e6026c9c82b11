//! Bounded fixed-delay reconnection policy.

use std::time::Duration;

/// Losses beyond this count exhaust the policy.
pub const MAX_ATTEMPTS: u32 = 3;

/// Fixed delay before each automatic reconnect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Where the policy currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryState {
    /// Connected or not yet started; no retry pending.
    #[default]
    Idle,
    /// A reconnect attempt is pending or in flight.
    Attempting,
    /// The attempt bound was exceeded; no further automatic attempts.
    Exhausted,
}

/// What to do after a connection loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-open the transport after [`RECONNECT_DELAY`].
    Retry,
    /// Stop retrying; the caller should engage the polling fallback.
    GiveUp,
}

/// Decides whether to re-open the channel after a loss.
///
/// Pure state machine: the session owns the timers. An open failure counts
/// exactly like a post-open close or error. The attempt counter survives a
/// successful automatic reconnect; only a manual reconnect zeroes it.
#[derive(Debug, Default)]
pub struct ReconnectPolicy {
    attempts: u32,
    state: RetryState,
}

impl ReconnectPolicy {
    /// Create a fresh policy in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Losses counted since the last manual reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Count a connection loss and decide what happens next.
    pub fn on_loss(&mut self) -> RetryDecision {
        if self.state == RetryState::Exhausted {
            return RetryDecision::GiveUp;
        }

        self.attempts += 1;
        if self.attempts > MAX_ATTEMPTS {
            self.state = RetryState::Exhausted;
            RetryDecision::GiveUp
        } else {
            self.state = RetryState::Attempting;
            RetryDecision::Retry
        }
    }

    /// The transport opened successfully.
    pub fn connected(&mut self) {
        self.state = RetryState::Idle;
    }

    /// Manual reconnect: zero the counter and force an immediate attempt,
    /// from any state including [`RetryState::Exhausted`].
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.state = RetryState::Attempting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_up_to_the_bound() {
        let mut policy = ReconnectPolicy::new();
        for attempt in 1..=MAX_ATTEMPTS {
            assert_eq!(policy.on_loss(), RetryDecision::Retry);
            assert_eq!(policy.attempts(), attempt);
            assert_eq!(policy.state(), RetryState::Attempting);
        }
    }

    #[test]
    fn test_fourth_loss_exhausts_and_fifth_adds_nothing() {
        let mut policy = ReconnectPolicy::new();
        for _ in 0..MAX_ATTEMPTS {
            assert_eq!(policy.on_loss(), RetryDecision::Retry);
        }

        assert_eq!(policy.on_loss(), RetryDecision::GiveUp);
        assert_eq!(policy.state(), RetryState::Exhausted);

        let attempts_when_exhausted = policy.attempts();
        assert_eq!(policy.on_loss(), RetryDecision::GiveUp);
        assert_eq!(policy.attempts(), attempts_when_exhausted);
    }

    #[test]
    fn test_manual_reset_recovers_from_exhaustion() {
        let mut policy = ReconnectPolicy::new();
        for _ in 0..=MAX_ATTEMPTS {
            policy.on_loss();
        }
        assert_eq!(policy.state(), RetryState::Exhausted);

        policy.reset();
        assert_eq!(policy.attempts(), 0);
        assert_eq!(policy.state(), RetryState::Attempting);
        assert_eq!(policy.on_loss(), RetryDecision::Retry);
    }

    #[test]
    fn test_successful_open_keeps_the_count() {
        let mut policy = ReconnectPolicy::new();
        policy.on_loss();
        policy.on_loss();
        policy.connected();

        assert_eq!(policy.state(), RetryState::Idle);
        assert_eq!(policy.attempts(), 2);
    }
}
