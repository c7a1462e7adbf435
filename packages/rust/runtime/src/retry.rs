//! Bounded retry with exponential backoff for external calls.
//!
//! Only transport-shaped errors are retried. Budget denials never reach
//! this layer; they are handled before a call is attempted.

use std::time::Duration;

use orgscout_shared::{Result, config::TransportConfig};

/// Retry schedule: `attempts` total tries, delays growing from `initial`
/// by `multiplier` per attempt, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial: Duration::from_millis(1000),
            max: Duration::from_millis(8000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn from_transport(config: &TransportConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            initial: Duration::from_millis(config.retry_initial_ms),
            max: Duration::from_millis(config.retry_max_ms),
            multiplier: 2.0,
        }
    }

    /// Compute the backoff delay for the given retry attempt (0-indexed).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        #[allow(clippy::cast_possible_wrap)]
        let multiplier = self.multiplier.powi(attempt as i32);
        let delay = self.initial.as_secs_f64() * multiplier;
        let capped = delay.min(self.max.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Run `op` under this policy. Retryable errors are retried with
    /// backoff until the attempt budget runs out; other errors return
    /// immediately.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.attempts => {
                    let delay = self.backoff_delay(attempt);
                    tracing::warn!(
                        op = op_name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
