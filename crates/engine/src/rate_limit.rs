//! Fixed-interval pacing for upstream history calls.
//!
//! Kraken keeps a per-account call counter that grows with every call and
//! decays continuously at a tier-dependent rate. Spacing calls by the time it
//! takes to decay one call's cost keeps the counter from ever growing.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Spaces consecutive calls at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between call starts.
    interval: Duration,
    /// Start of the previous call.
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter with an explicit interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Configured pacing interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until the next call is allowed, then records it.
    ///
    /// The first call goes through immediately.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let ready_at = previous + self.interval;
            if Instant::now() < ready_at {
                debug!(
                    wait_ms = ready_at.saturating_duration_since(Instant::now()).as_millis() as u64,
                    "Pacing before next call"
                );
                sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}
