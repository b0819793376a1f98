//! Retry policy for remote calls.
//!
//! ## Policy (per call, `attempt` in `0..max_retries`)
//!
//! - **Rate limit**: wait `reset_at - now + buffer` through the shared gate,
//!   then retry. On the last attempt fail with `MaxRetriesExceeded` without
//!   waiting; a non-positive wait fails with `RateLimitExceeded`.
//! - **Server error (>= 500)**: sleep `backoff_factor ** attempt` seconds and
//!   retry; on the last attempt propagate the server error.
//! - **Anything else** (including timeouts): propagate immediately.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::rate_limit::{RateLimitGate, compute_rate_limit_wait};
use super::timeout::with_timeout;
use crate::config::ApiConfig;
use crate::types::{ErrorCategory, GuardError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f32,
    pub max_backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(api: &ApiConfig) -> Self {
        Self {
            max_retries: api.max_retries,
            backoff_factor: api.backoff_factor,
            max_backoff: Duration::from_secs(api.max_backoff_secs),
            request_timeout: api.request_timeout(),
        }
    }

    /// Server-error delays: 1s, factor, factor², ... capped at `max_backoff`
    pub fn backoff_schedule(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(1))
            .with_factor(self.backoff_factor)
            .with_max_delay(self.max_backoff)
            .with_max_times(self.max_retries as usize)
            .build()
    }

    /// Run `call` under the policy. Each attempt waits for the gate and is
    /// bounded by the request timeout.
    pub async fn run<T, F, Fut>(&self, gate: &RateLimitGate, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.max_retries == 0 {
            return Err(GuardError::MaxRetriesExceeded {
                operation: operation.to_string(),
                attempts: 0,
                last_error: "no attempts allowed".to_string(),
            });
        }

        let mut backoff = self.backoff_schedule();

        for attempt in 0..self.max_retries {
            gate.ready().await;

            let err = match with_timeout(self.request_timeout, call(), operation).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let is_last = attempt + 1 == self.max_retries;
            let Some(api) = err.api_error() else {
                return Err(err);
            };

            match api.category {
                ErrorCategory::RateLimit => {
                    if is_last {
                        warn!(operation, attempt, "Rate limit exceeded and max retries reached");
                        return Err(GuardError::MaxRetriesExceeded {
                            operation: operation.to_string(),
                            attempts: self.max_retries,
                            last_error: err.to_string(),
                        });
                    }

                    let now = chrono::Utc::now().timestamp();
                    let Some(wait) = compute_rate_limit_wait(api.reset_at, now, gate.buffer()) else {
                        return Err(GuardError::RateLimitExceeded {
                            operation: operation.to_string(),
                            message: api.message.clone(),
                        });
                    };

                    warn!(
                        operation,
                        attempt,
                        wait_secs = wait.as_secs(),
                        "Rate limit exceeded, waiting for reset"
                    );
                    gate.block_for(wait).await;
                }
                ErrorCategory::Transient => {
                    if is_last {
                        return Err(err);
                    }

                    let delay = backoff.next().unwrap_or(self.max_backoff);
                    warn!(
                        operation,
                        attempt,
                        status = api.status,
                        wait_secs = delay.as_secs(),
                        "Server error, retrying"
                    );
                    sleep(delay).await;
                }
                _ => {
                    debug!(operation, error = %err, "Non-retryable error");
                    return Err(err);
                }
            }
        }

        Err(GuardError::MaxRetriesExceeded {
            operation: operation.to_string(),
            attempts: self.max_retries,
            last_error: "retries exhausted".to_string(),
        })
    }
}
