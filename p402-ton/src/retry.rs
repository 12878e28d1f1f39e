//! Bounded retry with exponential backoff.
//!
//! Used by settlement only: verification of a not-yet-indexed transaction
//! legitimately fails with a transient "not found", so settlement retries
//! that (and transport errors) a bounded number of times. Every other
//! failure is final and returns immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Retry policy with exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Computes the delay preceding the given attempt (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let multiplier = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails permanently, or the
    /// attempt budget is exhausted.
    ///
    /// # Errors
    ///
    /// Returns the last error once no attempts remain, or the first error
    /// `is_retryable` rejects.
    pub async fn execute<F, Fut, T, E>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            let delay = self.delay_for_attempt(attempt);
            if !delay.is_zero() {
                tracing::debug!(attempt, ?delay, "retrying after delay");
                sleep(delay).await;
            }
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if !is_retryable(&e) || attempt >= self.max_attempts {
                        return Err(e);
                    }
                    tracing::warn!(attempt, max_attempts = self.max_attempts, "retryable failure");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
        };
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = fast_policy()
            .execute(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move { if n < 2 { Err("transient") } else { Ok(n) } }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_do_not_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = fast_policy()
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("permanent") }
                },
                |_| false,
            )
            .await;
        assert_eq!(result, Err("permanent"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempt_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = fast_policy()
            .execute(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("transient") }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Err("transient"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
