//! Bounded retry with growing, jittered backoff around fallible async calls.
//!
//! Exhaustion is an ordinary value (`RetryExhausted`), not a propagated error:
//! callers record a terminal failed state for one item and move on.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use metrics::counter;

#[derive(Debug, Clone, Copy)]
pub struct Retrier {
    max_attempts: u32,
    base_delay: Duration,
}

/// All attempts failed. Carries the attempt count and the last error seen.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_error: anyhow::Error,
}

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

impl std::error::Error for RetryExhausted {}

impl Retrier {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Invoke `op` up to `max_attempts` times, returning the first success.
    /// The operation is a black box: it must be safe to repeat.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    counter!("watcher_retry_attempts_total").increment(1);
                    tracing::warn!(
                        op = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                }
            }
        }
        Err(RetryExhausted {
            attempts: self.max_attempts,
            last_error: last_error
                .unwrap_or_else(|| anyhow::anyhow!("operation was never attempted")),
        })
    }

    /// Delay before the attempt following `failed_attempts` failures: the base
    /// delay grows linearly, plus uniform jitter in `[0, base_delay)` so
    /// concurrent watchers do not hammer a provider in lockstep.
    fn backoff_delay(&self, failed_attempts: u32) -> Duration {
        let jitter = self.base_delay.mul_f64(rand::random::<f64>());
        self.base_delay * failed_attempts + jitter
    }
}
