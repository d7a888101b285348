//! Retry policy for refinement calls.
//!
//! Rate-limit responses back off linearly (1×, 2×, 3× the unit); any other
//! failure waits a fixed short delay. The policy only computes delays; the
//! caller owns the loop and the sleeping.

use crate::config::RefineConfig;
use crate::error::PipelineError;
use std::time::Duration;

/// Bounded retry policy injected into the refiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included
    pub max_attempts: u32,
    /// Backoff unit after a rate-limit response
    pub rate_limit_backoff: Duration,
    /// Delay before retrying any other failure
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_backoff: Duration::from_secs(2),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl From<&RefineConfig> for RetryPolicy {
    fn from(config: &RefineConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after `error` on the 0-based `attempt`.
    ///
    /// Returns `None` when no attempt remains, so the caller gives up without
    /// sleeping. A rate limit on the final attempt still waits, leaving the
    /// provider room before the next item is sent.
    pub fn delay_after(&self, attempt: u32, error: &PipelineError) -> Option<Duration> {
        let is_last = attempt + 1 >= self.max_attempts;
        if error.is_rate_limited() {
            let wait = self.rate_limit_backoff.saturating_mul(attempt + 1);
            return Some(wait);
        }
        if is_last {
            None
        } else {
            Some(self.retry_delay)
        }
    }

    /// Whether another attempt is allowed after the 0-based `attempt`.
    pub fn has_attempt_after(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate_limited() -> PipelineError {
        PipelineError::Llm {
            message: "HTTP 429: slow down".to_string(),
            status_code: Some(429),
        }
    }

    fn server_error() -> PipelineError {
        PipelineError::Llm {
            message: "HTTP 503: unavailable".to_string(),
            status_code: Some(503),
        }
    }

    #[test]
    fn test_rate_limit_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0, &rate_limited()), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_after(1, &rate_limited()), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_after(2, &rate_limited()), Some(Duration::from_secs(6)));
    }

    #[test]
    fn test_other_failures_use_fixed_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(0, &server_error()), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_after(1, &server_error()), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_no_delay_after_final_failure() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(2, &server_error()), None);
        assert!(!policy.has_attempt_after(2));
        assert!(policy.has_attempt_after(1));
    }

    #[test]
    fn test_from_config() {
        let config = RefineConfig {
            max_attempts: 5,
            rate_limit_backoff_ms: 10,
            retry_delay_ms: 3,
            ..Default::default()
        };
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.rate_limit_backoff, Duration::from_millis(10));
        assert_eq!(policy.retry_delay, Duration::from_millis(3));
    }
}
