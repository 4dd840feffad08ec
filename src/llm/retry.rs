//! Retry with exponential backoff for calls to the reasoning service.
//!
//! Only transient failures are retried: transport errors, 408, 429 and
//! 5xx responses. Everything else fails on the first attempt.

use anyhow::Result;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;

/// How often and how patiently to retry.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Time needed to run every attempt to its own timeout, plus the
    /// delays between them and `grace` for connection setup.
    pub fn deadline_for(&self, per_attempt: Duration, grace: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        let delays: Duration = (1..attempts).map(|attempt| self.delay_after(attempt)).sum();
        per_attempt * attempts + delays + grace
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Failure of one attempt, classified for the retry loop.
#[derive(Debug)]
pub enum AttemptError {
    Retryable(anyhow::Error),
    Fatal(anyhow::Error),
}

/// Determine if a status code is worth another attempt.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Run `operation` until it succeeds, fails fatally, or the policy runs out.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, provider: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(provider, attempt, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(AttemptError::Fatal(err)) => return Err(err),
            Err(AttemptError::Retryable(err)) => {
                if attempt >= attempts {
                    return Err(err.context(format!(
                        "{provider}: all {attempts} attempts failed"
                    )));
                }
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    provider,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
