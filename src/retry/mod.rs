use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::errors::{ArtefactError, Result};

/// Exponential backoff bounds for rate-limited calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub max_tries: u32,
    pub max_elapsed_secs: u64,
    pub initial_delay_ms: u64,
    pub factor: u32,
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_tries: 5,
            max_elapsed_secs: 70,
            initial_delay_ms: 1_000,
            factor: 2,
            max_delay_ms: 30_000,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let mult = (self.factor.max(1) as u64).saturating_pow(retry.saturating_sub(1));
        let ms = self.initial_delay_ms.saturating_mul(mult).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed_secs)
    }
}

/// Run `op` until it succeeds, fails with something other than a rate limit,
/// or the policy budget is spent. Only `ArtefactError::RateLimited` is retried.
pub async fn retry_rate_limited<T, F, Fut>(policy: &BackoffPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let err = match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_rate_limited() => e,
            Err(e) => return Err(e),
        };

        let delay = policy.delay_for(attempt);
        let out_of_tries = attempt >= policy.max_tries.max(1);
        let out_of_time = started.elapsed() + delay > policy.max_elapsed();
        if out_of_tries || out_of_time {
            tracing::warn!(attempt, "rate limit retry budget exhausted");
            return Err(ArtefactError::RetriesExhausted {
                attempts: attempt,
                last: err.to_string(),
            });
        }

        tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "rate limited, backing off");
        sleep(delay).await;
    }
}
