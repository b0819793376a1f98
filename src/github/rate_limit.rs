//! Process-wide rate-limit gate.
//!
//! All clones of the client share one gate. When the host reports an
//! exhausted quota, the gate is closed until a single deadline and every
//! worker waits for that deadline before its next attempt.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

/// Wait until the quota resets, plus a safety buffer.
///
/// A missing reset time counts as "now". Returns `None` when the computed
/// wait is not positive.
pub fn compute_rate_limit_wait(reset_at: Option<i64>, now_epoch: i64, buffer: Duration) -> Option<Duration> {
    let reset = reset_at.unwrap_or(now_epoch);
    let wait = reset - now_epoch + buffer.as_secs() as i64;
    (wait > 0).then(|| Duration::from_secs(wait as u64))
}

/// Snapshot of the gate for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Number of times a caller actually waited
    pub waits: u64,
    pub total_wait: Duration,
    /// Last `x-ratelimit-remaining` seen
    pub remaining: Option<u64>,
    /// Last `x-ratelimit-reset` seen (unix seconds)
    pub reset_at: Option<i64>,
}

impl std::fmt::Display for GateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} wait(s), {}s total", self.waits, self.total_wait.as_secs())
    }
}

#[derive(Debug, Default)]
struct GateState {
    blocked_until: Option<Instant>,
    stats: GateStats,
}

#[derive(Debug)]
pub struct RateLimitGate {
    state: Mutex<GateState>,
    buffer: Duration,
}

impl RateLimitGate {
    pub fn new(buffer: Duration) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            buffer,
        }
    }

    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    /// Wait until the gate is open. Re-checks after waking in case another
    /// caller pushed the deadline further out.
    pub async fn ready(&self) {
        loop {
            let deadline = {
                let state = self.state.lock().await;
                match state.blocked_until {
                    Some(until) if until > Instant::now() => until,
                    _ => return,
                }
            };

            let wait = deadline.saturating_duration_since(Instant::now());
            debug!(wait_secs = wait.as_secs(), "Waiting for rate-limit gate");
            sleep_until(deadline).await;

            let mut state = self.state.lock().await;
            state.stats.waits += 1;
            state.stats.total_wait += wait;
        }
    }

    /// Close the gate for `wait`. An existing later deadline is kept.
    pub async fn block_for(&self, wait: Duration) {
        let until = Instant::now() + wait;
        let mut state = self.state.lock().await;
        if state.blocked_until.is_none_or(|current| current < until) {
            state.blocked_until = Some(until);
        }
    }

    /// Record quota headers from a response; closes the gate when the quota
    /// is exhausted.
    pub async fn observe(&self, remaining: Option<u64>, reset_at: Option<i64>, now_epoch: i64) {
        {
            let mut state = self.state.lock().await;
            if remaining.is_some() {
                state.stats.remaining = remaining;
            }
            if reset_at.is_some() {
                state.stats.reset_at = reset_at;
            }
        }

        if remaining == Some(0)
            && let Some(wait) = compute_rate_limit_wait(reset_at, now_epoch, self.buffer)
        {
            warn!(
                wait_secs = wait.as_secs(),
                "Rate-limit quota exhausted, closing gate"
            );
            self.block_for(wait).await;
        }
    }

    pub async fn stats(&self) -> GateStats {
        self.state.lock().await.stats.clone()
    }
}

impl Default for RateLimitGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(crate::constants::retry::RATE_LIMIT_BUFFER_SECS))
    }
}
