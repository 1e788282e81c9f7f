//! Capped exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, warn};
use trade_history_data::SyncError;

/// Retry policy applied to every fallible sync step.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; zero disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Checks the policy for values that would produce invalid delays.
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(SyncError::Config(format!(
                "retry multiplier must be >= 1, got {}",
                self.multiplier
            )));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(SyncError::Config(
                "initial backoff exceeds max backoff".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_backoff.as_secs_f64()))
    }

    /// Runs `op`, retrying transient failures with backoff.
    ///
    /// Permanent failures, and transient ones once retries are exhausted,
    /// are returned unchanged.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        operation = operation,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, backing off"
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    if err.is_transient() {
                        error!(
                            operation = operation,
                            attempts = attempt + 1,
                            error = %err,
                            "Retries exhausted"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
