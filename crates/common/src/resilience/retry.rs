//! Retry policy with linear backoff
//!
//! The policy only answers two questions: may another attempt be made after
//! `n` failed ones, and how long to wait before it. Running the attempts
//! (and deciding which failures are transient) is the caller's job.

use std::time::Duration;

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),
    /// Linear backoff: `base * attempt`
    Linear { base: Duration },
}

impl BackoffStrategy {
    /// Calculate the delay that follows the given (1-based) failed attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(delay) => *delay,
            BackoffStrategy::Linear { base } => base.saturating_mul(attempt.max(1)),
        }
    }
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the operation after the given delay
    RetryAfter(Duration),
    /// Don't retry the operation
    Stop,
}

/// Attempt budget plus backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` total attempts (initial try +
    /// retries). Zero is treated as one.
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }

    /// Linear policy: the n-th retry waits `base * n`.
    pub fn linear(max_attempts: u32, base: Duration) -> Self {
        Self::new(max_attempts, BackoffStrategy::Linear { base })
    }

    /// Total number of attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> BackoffStrategy {
        self.backoff
    }

    /// Decide what happens after attempt number `attempt` (1-based) failed
    /// with a retryable cause.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            RetryDecision::Stop
        } else {
            RetryDecision::RetryAfter(self.backoff.calculate_delay(attempt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_delay_grows_with_attempt() {
        let backoff = BackoffStrategy::Linear { base: Duration::from_millis(100) };
        assert_eq!(backoff.calculate_delay(1), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(2), Duration::from_millis(200));
        assert_eq!(backoff.calculate_delay(3), Duration::from_millis(300));
    }

    #[test]
    fn fixed_delay_is_constant() {
        let backoff = BackoffStrategy::Fixed(Duration::from_millis(50));
        assert_eq!(backoff.calculate_delay(1), backoff.calculate_delay(7));
    }

    #[test]
    fn policy_stops_at_budget() {
        let policy = RetryPolicy::linear(3, Duration::from_secs(1));
        assert_eq!(policy.decide(1), RetryDecision::RetryAfter(Duration::from_secs(1)));
        assert_eq!(policy.decide(2), RetryDecision::RetryAfter(Duration::from_secs(2)));
        assert_eq!(policy.decide(3), RetryDecision::Stop);
    }

    #[test]
    fn zero_attempts_means_single_try() {
        let policy = RetryPolicy::linear(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.decide(1), RetryDecision::Stop);
    }

    #[test]
    fn delays_strictly_increase_under_linear_policy() {
        let policy = RetryPolicy::linear(5, Duration::from_millis(10));
        let delays: Vec<Duration> = (1..5)
            .filter_map(|attempt| match policy.decide(attempt) {
                RetryDecision::RetryAfter(delay) => Some(delay),
                RetryDecision::Stop => None,
            })
            .collect();

        assert_eq!(delays.len(), 4);
        assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
