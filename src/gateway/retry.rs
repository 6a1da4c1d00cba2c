//! Retry policy, delay calculation, and the retrying gateway decorator.
//!
//! Every outbound AI call goes through [`RetryingGateway`], which reads the
//! [`RetryPolicy`] carried on that call's
//! [`CompletionOptions`](crate::types::CompletionOptions). Call sites tune
//! attempts and backoff; nothing wraps retries ad hoc.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::CompletionGateway;
use crate::error::GatewayError;
use crate::telemetry;
use crate::types::{ChatMessage, CompletionOptions, RawCompletion};

/// Bounded retry with linear backoff.
///
/// ```rust
/// # use readaloud::gateway::RetryPolicy;
/// # use std::time::Duration;
/// let policy = RetryPolicy::new()
///     .max_attempts(3)
///     .base_delay(Duration::from_millis(1000));
/// assert_eq!(policy.delay_after_attempt(2), Duration::from_millis(2000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry; 0 is treated as 1. Default: 3.
    pub max_attempts: u32,
    /// Delay unit; the wait after attempt `n` is `base_delay * n`. Default: 1s.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that makes a single attempt.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sleep before the next attempt after attempt `attempt` (1-based) failed.
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `f` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// Every error is retried the same way; there is no transient/permanent
/// split. After the final attempt the last error is returned unchanged and
/// no sleep happens.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_after_attempt(attempt);
                metrics::counter!(telemetry::RETRIES_TOTAL, "operation" => operation.to_owned())
                    .increment(1);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after failed attempt"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Decorator that wraps a [`CompletionGateway`] with the per-call retry policy.
pub struct RetryingGateway {
    inner: Arc<dyn CompletionGateway>,
}

impl RetryingGateway {
    pub fn new(inner: Arc<dyn CompletionGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CompletionGateway for RetryingGateway {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<RawCompletion, GatewayError> {
        with_retry(&options.retry, options.operation, || {
            self.inner.complete(messages, options)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff() {
        let policy = RetryPolicy::new().base_delay(Duration::from_millis(250));
        assert_eq!(policy.delay_after_attempt(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after_attempt(2), Duration::from_millis(500));
        assert_eq!(policy.delay_after_attempt(3), Duration::from_millis(750));
    }

    #[test]
    fn default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(RetryPolicy::disabled().max_attempts, 1);
    }
}
