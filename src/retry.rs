//! Retry policy with exponential backoff and a hard deadline.
//!
//! [`RetryPolicy`] wraps a single adapter invocation: transient failures are
//! retried with exponential backoff, permanent failures are returned
//! immediately, and the whole attempt loop races against one deadline. The
//! deadline is a hard ceiling on *total* attempt time, not per-attempt time,
//! so a source cannot consume more than its share of a query no matter how
//! many retries remain.
//!
//! Cancellation is drop-based: when the caller drops the future returned by
//! [`RetryPolicy::run`] (the aggregation engine does this when a query is
//! cancelled), any in-flight attempt or backoff sleep aborts at its next
//! suspension point rather than running to completion.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//! use hakken::retry::RetryPolicy;
//! use hakken::error::Result;
//!
//! # async fn example() -> Result<()> {
//! let policy = RetryPolicy::new(3)
//!     .with_base_delay(Duration::from_millis(250))
//!     .with_max_delay(Duration::from_secs(4));
//!
//! let value = policy
//!     .run(Duration::from_secs(10), || async { Ok::<_, hakken::Error>(42) })
//!     .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Bounded retry with exponential backoff.
///
/// The delay before retry attempt `n` is `base_delay * 2^n`, capped at
/// `max_delay`. Only failures classified transient by
/// [`Error::kind`](crate::Error::kind) are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    /// Three retries, 500ms base delay, 8s cap.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry budget and default delays.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Sets the base delay used for the first backoff sleep.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the upper bound on any single backoff sleep.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Returns the configured retry budget.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the backoff delay before retry attempt `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Runs `op` with retries, bounded by `deadline` of total wall-clock time.
    ///
    /// `op` is invoked once per attempt. Transient failures sleep for the
    /// backoff delay and retry until the budget is exhausted; permanent
    /// failures return immediately. If `deadline` elapses, mid-attempt or
    /// mid-backoff, the result is [`Error::Timeout`], regardless of how
    /// many retries were left.
    pub async fn run<T, F, Fut>(&self, deadline: Duration, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = async {
            let mut attempt = 0;
            loop {
                match op().await {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_transient() && attempt < self.max_retries => {
                        tokio::time::sleep(self.backoff(attempt)).await;
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        match tokio::time::timeout(deadline, attempts).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(deadline)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(10)
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(600));

        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(600));
        assert_eq!(policy.backoff(9), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3);

        let result = policy
            .run(Duration::from_secs(60), || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::transient("mock", "flaky"))
                } else {
                    Ok("ok")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5);

        let result: Result<()> = policy
            .run(Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::permanent("mock", "gone"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_beats_remaining_retries() {
        let policy = RetryPolicy::new(u32::MAX).with_base_delay(Duration::from_millis(100));

        let result: Result<()> = policy
            .run(Duration::from_millis(350), || async {
                Err(Error::transient("mock", "always down"))
            })
            .await;

        assert!(result.unwrap_err().is_timeout());
    }
}
