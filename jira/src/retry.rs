//! Rate-aware retry for page fetches.
//!
//! Every remote read goes through [`with_retry`], driven by an explicit
//! [`RetryPolicy`] rather than inline control flow so the retry core stays
//! reusable and testable on its own. The delay schedule is tokio-retry's
//! exponential backoff with jitter applied, which avoids thundering-herd
//! synchronization across concurrently scheduled connectors.

use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tracing::{debug, warn};

use crate::JiraError;

/// Upper bound on an honored `Retry-After` hint, in seconds. Hints at or
/// above this are ignored as nonsensical.
const MAX_RETRY_AFTER_SECONDS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one.
    pub max_attempts: usize,
    /// First backoff delay.
    pub base_delay: Duration,
    /// Ceiling for the backoff delay before jitter.
    pub max_delay: Duration,
    /// Multiplier applied to the exponential schedule.
    pub backoff_factor: u64,
    /// Hard ceiling on a single attempt. Expiry is fatal, not retried.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(500),
            backoff_factor: 2,
            call_timeout: Duration::from_secs(120),
        }
    }
}

impl RetryPolicy {
    fn delays(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.base_delay.as_millis() as u64)
            .factor(self.backoff_factor)
            .max_delay(self.max_delay)
            .map(jitter)
    }
}

/// Run `call` until it succeeds, a non-retryable error surfaces, or the
/// policy's attempt budget is exhausted (in which case the last error is
/// returned).
///
/// A numeric `Retry-After` hint on the failed response adds a sleep of that
/// many seconds on top of the backoff delay.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, JiraError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, JiraError>>,
{
    let mut delays = policy.delays();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let result = match tokio::time::timeout(policy.call_timeout, call()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(JiraError::Timeout {
                    operation: operation.to_string(),
                    after: policy.call_timeout,
                })
            }
        };

        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            debug!(operation, attempt, error = %err, "Non-retryable error, aborting");
            return Err(err);
        }

        if attempt >= policy.max_attempts {
            warn!(
                operation,
                attempts = attempt,
                error = %err,
                "Retry attempts exhausted"
            );
            return Err(err);
        }

        if let Some(seconds) = err.retry_after() {
            if seconds > 0 && seconds < MAX_RETRY_AFTER_SECONDS {
                debug!(operation, seconds, "Honoring Retry-After hint");
                tokio::time::sleep(Duration::from_secs(seconds)).await;
            }
        }

        let delay = delays.next().unwrap_or(policy.max_delay);
        warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after transient error"
        );
        tokio::time::sleep(delay).await;
    }
}
