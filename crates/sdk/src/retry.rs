//! Retry decisions and exponential backoff.

use crate::config::RetryConfig;
use crate::error::{ClassifiedError, ErrorCategory};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// One retry performed during a logical request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryAttempt {
    /// Attempt that failed and triggered the retry.
    pub attempt: u32,
    pub delay_ms: u64,
    pub category: ErrorCategory,
}

/// Decides whether and when to retry, from an immutable [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: Arc<RetryConfig>,
}

impl RetryPolicy {
    pub fn new(config: Arc<RetryConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether a failure of `category` on attempt `attempt` (1-based) earns another try.
    pub fn should_retry(&self, category: ErrorCategory, attempt: u32) -> bool {
        attempt < self.config.max_attempts && self.config.is_retryable(category)
    }

    /// `min(base * 2^(attempt-1), max)`, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.max(1) - 1;
        2u32.checked_pow(exponent)
            .and_then(|factor| self.config.base_delay.checked_mul(factor))
            .map_or(self.config.max_delay, |delay| delay.min(self.config.max_delay))
    }

    /// Backoff for `attempt`, with full jitter when enabled.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        if self.config.jitter {
            self.compute_delay_with(attempt, random_bits())
        } else {
            self.backoff(attempt)
        }
    }

    /// Backoff for `attempt` using caller-supplied random bits for jitter.
    ///
    /// With jitter enabled the result is uniform in `[0, backoff(attempt)]`.
    pub fn compute_delay_with(&self, attempt: u32, random: u64) -> Duration {
        let delay = self.backoff(attempt);
        if !self.config.jitter || delay.is_zero() {
            return delay;
        }
        let span = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(random % span.saturating_add(1))
    }

    /// Wait before retrying after `error`, honoring a server `Retry-After` hint.
    pub fn delay_for(&self, error: &ClassifiedError, attempt: u32) -> Duration {
        let computed = self.compute_delay(attempt);
        match error.retry_after() {
            Some(hint) => computed.max(hint).min(self.config.max_delay),
            None => computed,
        }
    }
}

fn random_bits() -> u64 {
    uuid::Uuid::new_v4().as_u128() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(config: RetryConfig) -> RetryPolicy {
        RetryPolicy::new(Arc::new(config))
    }

    fn deterministic() -> RetryConfig {
        RetryConfig::default()
            .with_jitter(false)
            .with_delays(Duration::from_millis(100), Duration::from_millis(1000))
    }

    #[test]
    fn test_should_retry_stops_at_max_attempts() {
        let policy = policy(deterministic().with_max_attempts(3));

        assert!(policy.should_retry(ErrorCategory::Network, 1));
        assert!(policy.should_retry(ErrorCategory::Network, 2));
        for category in ErrorCategory::ALL {
            assert!(!policy.should_retry(category, 3));
            assert!(!policy.should_retry(category, 10));
        }
    }

    #[test]
    fn test_should_retry_respects_categories() {
        let policy = policy(deterministic().with_max_attempts(5));

        assert!(policy.should_retry(ErrorCategory::Server, 1));
        assert!(policy.should_retry(ErrorCategory::Timeout, 1));
        assert!(policy.should_retry(ErrorCategory::RateLimit, 1));
        assert!(!policy.should_retry(ErrorCategory::Auth, 1));
        assert!(!policy.should_retry(ErrorCategory::NotFound, 1));
        assert!(!policy.should_retry(ErrorCategory::Format, 1));
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let policy = policy(deterministic());

        assert_eq!(policy.compute_delay(1), Duration::from_millis(100));
        assert_eq!(policy.compute_delay(2), Duration::from_millis(200));
        assert_eq!(policy.compute_delay(3), Duration::from_millis(400));
        assert_eq!(policy.compute_delay(4), Duration::from_millis(800));
        assert_eq!(policy.compute_delay(5), Duration::from_millis(1000));
        assert_eq!(policy.compute_delay(64), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_monotonic_and_bounded() {
        let policy = policy(deterministic());
        let mut previous = Duration::ZERO;
        for attempt in 0..100 {
            let delay = policy.compute_delay(attempt);
            assert!(delay >= previous, "attempt {attempt} decreased");
            assert!(delay <= Duration::from_millis(1000));
            previous = delay;
        }
    }

    #[test]
    fn test_full_jitter_range() {
        let policy = policy(deterministic().with_jitter(true));

        assert_eq!(policy.compute_delay_with(3, 0), Duration::ZERO);
        let max = Duration::from_millis(400);
        let span = max.as_nanos() as u64;
        assert_eq!(policy.compute_delay_with(3, span), max);
        for bits in [1u64, 12345, u64::MAX / 3, u64::MAX] {
            assert!(policy.compute_delay_with(3, bits) <= max);
        }
        for _ in 0..50 {
            assert!(policy.compute_delay(3) <= max);
        }
    }

    #[test]
    fn test_retry_after_hint_is_honored_but_capped() {
        let policy = policy(deterministic());

        let hinted = ClassifiedError::new(ErrorCategory::RateLimit, "slow down")
            .with_metadata("retry_after_secs", 0);
        assert_eq!(policy.delay_for(&hinted, 2), Duration::from_millis(200));

        let long_hint = ClassifiedError::new(ErrorCategory::RateLimit, "slow down")
            .with_metadata("retry_after_secs", 60);
        assert_eq!(policy.delay_for(&long_hint, 1), Duration::from_millis(1000));
    }
}
