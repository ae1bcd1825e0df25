//! Gateway retry policy.
//!
//! Only transient gateway failures (502 Bad Gateway, 504 Gateway Timeout)
//! are retried. Retries are sequential with a fixed delay between attempts,
//! and the budget of a call only ever decreases.

use std::time::Duration;

/// Status codes the retry policy applies to.
pub const RETRIABLE_STATUS_CODES: [u16; 2] = [502, 504];

/// Default number of retries per call.
pub const DEFAULT_RETRY_COUNT: u32 = 1;

/// Default delay between retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Check whether a response status is eligible for a retry.
#[must_use]
pub fn is_retriable_status(status: u16) -> bool {
    RETRIABLE_STATUS_CODES.contains(&status)
}

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub retry_count: u32,
    /// Delay before each retry
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: DEFAULT_RETRY_COUNT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Create a policy from optional per-request overrides, falling back to
    /// the defaults for anything unset.
    #[must_use]
    pub fn from_overrides(retry_count: Option<u32>, retry_delay: Option<Duration>) -> Self {
        Self {
            retry_count: retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            retry_delay: retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
        }
    }

    /// Set the retry count.
    #[must_use]
    pub const fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the retry delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Start the budget for a single call.
    #[must_use]
    pub const fn budget(&self) -> RetryBudget {
        RetryBudget {
            remaining: self.retry_count,
            delay: self.retry_delay,
        }
    }
}

/// Remaining retries for one call, shared by every attempt the call makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u32,
    delay: Duration,
}

impl RetryBudget {
    /// Take one retry from the budget.
    ///
    /// Returns the delay to wait before resending, or `None` once the budget
    /// is exhausted.
    pub const fn consume(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.delay)
    }

    /// Retries left.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume a retry for `status` if it is retriable and budget remains,
    /// then sleep for the configured delay.
    ///
    /// Returns `true` when the caller should resend.
    pub async fn wait_for_retry(&mut self, status: u16) -> bool {
        if !is_retriable_status(status) {
            return false;
        }
        match self.consume() {
            Some(delay) => {
                tracing::warn!(
                    status,
                    remaining = self.remaining,
                    delay_ms = delay.as_millis() as u64,
                    "Gateway error, retrying request"
                );
                tokio::time::sleep(delay).await;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.retry_count, 1);
        assert_eq!(policy.retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_from_overrides() {
        let policy = RetryPolicy::from_overrides(Some(3), None);
        assert_eq!(policy.retry_count, 3);
        assert_eq!(policy.retry_delay, DEFAULT_RETRY_DELAY);

        let policy = RetryPolicy::from_overrides(None, Some(Duration::from_millis(10)));
        assert_eq!(policy.retry_count, DEFAULT_RETRY_COUNT);
        assert_eq!(policy.retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_retriable_statuses() {
        assert!(is_retriable_status(502));
        assert!(is_retriable_status(504));
        assert!(!is_retriable_status(503));
        assert!(!is_retriable_status(500));
        assert!(!is_retriable_status(429));
    }

    #[test]
    fn test_budget_exhausts() {
        let mut budget = RetryPolicy::default().with_retry_count(2).budget();
        assert_eq!(budget.consume(), Some(DEFAULT_RETRY_DELAY));
        assert_eq!(budget.remaining(), 1);
        assert_eq!(budget.consume(), Some(DEFAULT_RETRY_DELAY));
        assert_eq!(budget.consume(), None);
        assert_eq!(budget.remaining(), 0);
    }

    #[tokio::test]
    async fn test_wait_for_retry_skips_non_gateway_codes() {
        let mut budget = RetryPolicy::default()
            .with_retry_delay(Duration::from_millis(1))
            .budget();
        assert!(!budget.wait_for_retry(500).await);
        assert_eq!(budget.remaining(), 1);

        assert!(budget.wait_for_retry(502).await);
        assert!(!budget.wait_for_retry(504).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_retry_sleeps_for_delay() {
        let mut budget = RetryPolicy::default()
            .with_retry_delay(Duration::from_secs(30))
            .budget();
        let started = tokio::time::Instant::now();
        assert!(budget.wait_for_retry(504).await);
        assert!(started.elapsed() >= Duration::from_secs(30));
    }
}
