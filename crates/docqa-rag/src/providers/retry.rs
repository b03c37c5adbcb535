//! Retry with exponential backoff and a per-attempt timeout

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::config::ProviderConfig;
use crate::error::{Error, Result};

/// Outcome of one failed attempt
#[derive(Debug)]
pub enum Failure {
    /// Worth another attempt: network errors, timeouts, 5xx, 408, 429
    Transient(Error),
    /// Will fail the same way again: bad key, malformed request
    Permanent(Error),
}

impl Failure {
    /// Classify an error response by its HTTP status
    pub fn from_status(status: StatusCode, error: Error) -> Self {
        if status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            Failure::Transient(error)
        } else {
            Failure::Permanent(error)
        }
    }
}

impl From<Error> for Failure {
    fn from(error: Error) -> Self {
        Failure::Transient(error)
    }
}

/// How remote provider calls are retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
    /// Upper bound on a single attempt
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_retries: u32, base_delay: Duration, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            attempt_timeout,
        }
    }

    /// Policy derived from the provider settings
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(500), config.timeout())
    }

    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Worst-case wall time of `run`: every attempt times out and every backoff is taken
    pub fn total_budget(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff = (0..self.max_retries)
            .map(|attempt| self.delay_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add);
        self.attempt_timeout
            .saturating_mul(attempts)
            .saturating_add(backoff)
    }

    /// Run `operation` until it succeeds, fails permanently or the retries
    /// are exhausted.
    ///
    /// A timed-out attempt counts as a transient failure. The last error is
    /// returned.
    pub async fn run<F, Fut, T>(&self, provider: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, Failure>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let outcome = match timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(Failure::Transient(Error::provider(
                    provider,
                    format!("request timed out after {:?}", self.attempt_timeout),
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(Failure::Permanent(e)) => {
                    tracing::warn!("{} request rejected, not retrying: {}", provider, e);
                    return Err(e);
                }
                Err(Failure::Transient(e)) => {
                    if attempt < self.max_retries {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            "{} request failed (attempt {}/{}): {}; retrying in {:?}",
                            provider,
                            attempt + 1,
                            self.max_retries + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::provider(provider, "request failed")))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ProviderConfig::default())
    }
}
