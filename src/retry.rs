//! Bounded retries with backoff for model calls.
//!
//! ```text
//! attempt 1 fails (transient)   -> sleep 1s
//! attempt 2 fails (rate limit)  -> delay doubles, sleep 2s
//! attempt 3 fails               -> return that error
//! ```
//!
//! Content-policy and validation failures return on the first attempt. Only
//! rate-limit errors grow the delay; other transient errors reuse it.

use std::future::Future;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::error::{Result, RetryClass};

/// Retry settings for one model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` counts the first try and is at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Create a policy from config.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.max_retry_attempts, config.initial_retry_delay())
    }

    /// Total attempts, including the first.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry.
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Run `op` until it succeeds, fails non-retryably, or runs out of attempts.
    ///
    /// Waiting suspends only the calling task.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the last error once all
    /// attempts are used.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let class = err.retry_class();
            if class == RetryClass::NonRetryable || attempt >= self.max_attempts {
                return Err(err);
            }
            if class == RetryClass::RateLimited {
                delay = delay.saturating_mul(2);
            }

            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "model call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
