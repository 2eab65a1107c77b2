//! Retry and timeout wrapping for remote inspection
//!
//! The backend is eventually consistent and rate limited; individual calls
//! time out or get throttled routinely. The retrying adapter bounds each
//! call and retries transient failures with exponential backoff. Exhausting
//! the attempts returns the final error; the validator decides what that
//! means for the run (it never aborts it).

use std::time::Duration;

use async_trait::async_trait;

use super::{InspectError, RemoteState, RemoteStateInspector};

/// Backoff configuration for remote inspection calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Cap on the backoff delay
    pub max_delay: Duration,

    /// Backoff multiplier applied per retry
    pub multiplier: f64,
}

impl RetryPolicy {
    /// No retries; the first failure is final
    pub const NONE: Self = Self {
        max_attempts: 1,
        initial_delay: Duration::from_secs(0),
        max_delay: Duration::from_secs(0),
        multiplier: 1.0,
    };

    /// Retry schedule: immediate, 200ms, 400ms
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        initial_delay: Duration::from_millis(200),
        max_delay: Duration::from_secs(5),
        multiplier: 2.0,
    };

    /// Delay before the retry following `attempt` (1-indexed), or `None`
    /// when the attempts are exhausted
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let exponent = (attempt - 1) as f64;
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powf(exponent);
        Some(Duration::from_secs_f64(
            delay.min(self.max_delay.as_secs_f64()),
        ))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Decorator adding per-call timeout and retry with backoff to any inspector
#[derive(Debug, Clone)]
pub struct RetryingInspector<I> {
    inner: I,
    policy: RetryPolicy,
    call_timeout: Duration,
}

impl<I> RetryingInspector<I> {
    /// Wraps an inspector with the given policy and per-call timeout
    pub fn new(inner: I, policy: RetryPolicy, call_timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            call_timeout,
        }
    }
}

#[async_trait]
impl<I: RemoteStateInspector> RemoteStateInspector for RetryingInspector<I> {
    async fn inspect(&self, stack_name: &str) -> Result<RemoteState, InspectError> {
        let mut attempt = 1;

        loop {
            let outcome = tokio::time::timeout(self.call_timeout, self.inner.inspect(stack_name))
                .await
                .unwrap_or(Err(InspectError::Timeout(self.call_timeout)));

            let error = match outcome {
                Ok(state) => return Ok(state),
                Err(error) => error,
            };

            if error.is_retryable() {
                if let Some(delay) = self.policy.delay_for_attempt(attempt) {
                    tracing::debug!(
                        stack = stack_name,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %error,
                        "retrying remote inspection after {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                tracing::warn!(
                    stack = stack_name,
                    attempts = attempt,
                    error = %error,
                    "remote inspection exhausted retries"
                );
            } else {
                tracing::warn!(
                    stack = stack_name,
                    error = %error,
                    "remote inspection failed with non-retryable error"
                );
            }

            return Err(error);
        }
    }
}
