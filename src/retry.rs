//! Bounded retry with exponential backoff for transient request failures
//!
//! Only errors that report themselves as retryable through [`RetryableError`] are
//! retried. Response-shape problems are never retried.

use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::warn;

/// Classification of errors for the retry loop
pub trait RetryableError {
    /// Whether repeating the same request could succeed
    fn is_retryable(&self) -> bool;

    /// Short human-readable reason, used in logs
    fn retry_reason(&self) -> &str;
}

/// Retry policy for requests sent to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Number of retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for a single backoff delay
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    /// A policy that never retries
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::new()
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Backoff delays, one per retry: `base_delay * 2^n`, capped and jittered
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        let half_base = (self.base_delay.as_millis() as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(half_base)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_retries)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `operation`, retrying retryable failures according to `config`
pub async fn with_retry<T, E, F, Fut>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryIf::spawn(config.strategy(), operation, |err: &E| {
        let retry = err.is_retryable();
        if retry {
            warn!(
                operation = operation_name,
                reason = err.retry_reason(),
                error = %err,
                "Retrying after transient failure"
            );
        }
        retry
    })
    .await
}
