//! Retry policy shared by every call site that needs bounded retries.
//!
//! The bus connection is the only caller today, but the policy is a plain
//! value so a steady-state supervisor can reuse the same backoff shape.
//!
//! ```ignore
//! let policy = RetryPolicy::startup();
//! let conn = policy.retry("amqp connect", || AmqpBroker::dial(url)).await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shape of the delay between consecutive attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// `unit * n²` after the n-th failure.
    Quadratic { unit_ms: u64 },
    /// `initial * multiplier^(n-1)` after the n-th failure.
    Exponential { initial_ms: u64, multiplier: u32 },
    /// Same delay after every failure.
    Fixed { delay_ms: u64 },
}

impl Backoff {
    fn raw_delay(&self, failures: u32) -> Duration {
        let ms = match self {
            Backoff::Quadratic { unit_ms } => {
                let n = u64::from(failures);
                unit_ms.saturating_mul(n.saturating_mul(n))
            }
            Backoff::Exponential {
                initial_ms,
                multiplier,
            } => {
                let exp = failures.saturating_sub(1);
                let factor = u64::from(*multiplier).saturating_pow(exp);
                initial_ms.saturating_mul(factor)
            }
            Backoff::Fixed { delay_ms } => *delay_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Bounded retry with a configurable backoff and an optional cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    #[serde(default = "RetryPolicy::default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "RetryPolicy::default_backoff")]
    pub backoff: Backoff,
    /// Upper bound on a single sleep. `None` lets the backoff grow unbounded.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::startup()
    }
}

impl RetryPolicy {
    fn default_max_retries() -> u32 {
        5
    }

    fn default_backoff() -> Backoff {
        Backoff::Quadratic { unit_ms: 1000 }
    }

    /// Startup connection discipline: 1 attempt + 5 retries, sleeping n² seconds
    /// after the n-th failure.
    pub fn startup() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            backoff: Self::default_backoff(),
            max_delay_ms: None,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Backoff::Fixed { delay_ms: 0 },
            max_delay_ms: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay_ms = Some(u64::try_from(max_delay.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Total attempts the policy allows, first one included.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep taken after `failures` consecutive failures (`failures >= 1`).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let delay = self.backoff.raw_delay(failures);
        match self.max_delay_ms {
            Some(cap) => delay.min(Duration::from_millis(cap)),
            None => delay,
        }
    }

    /// Every sleep the policy will take before giving up, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.max_retries).map(|failures| self.delay_for(failures))
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    pub async fn retry<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, Exhausted<E>>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut failures: u32 = 0;
        loop {
            match op().await {
                Ok(value) => {
                    tracing::info!(operation = label, attempts = failures + 1, "succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    failures += 1;
                    tracing::warn!(operation = label, attempt = failures, error = %err, "attempt failed");

                    if failures > self.max_retries {
                        tracing::error!(
                            operation = label,
                            attempts = failures,
                            "giving up after {} retries",
                            self.max_retries
                        );
                        return Err(Exhausted {
                            attempts: failures,
                            last_error: err,
                        });
                    }

                    let delay = self.delay_for(failures);
                    tracing::info!(
                        operation = label,
                        delay_ms = delay.as_millis() as u64,
                        "backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// The attempt budget ran out.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}
