//! Rolling-window limiter for key-set fetches.
//!
//! At most `max_fetches` fetches may start within any `window`-long interval,
//! process-wide. Callers over the limit wait until the oldest fetch in the
//! window ages out; they never fail and never bypass the limiter.
//!
//! Time comes from an injectable [`Clock`] so tests can drive the window
//! deterministically.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Length of the rolling window for a per-minute limit.
pub const ONE_MINUTE: Duration = Duration::from_secs(60);

/// Source of time for the limiter.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by tokio's timer.
///
/// Honors `tokio::time::pause()`, so paused-time tests stay deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Shared fetch limiter.
pub struct FetchRateLimiter {
    clock: Arc<dyn Clock>,
    max_fetches: usize,
    window: Duration,
    /// Start instants of the fetches inside the current window, oldest first.
    recent: Mutex<VecDeque<Instant>>,
}

impl FetchRateLimiter {
    /// Create a limiter allowing `max_fetches` per `window`.
    ///
    /// A `max_fetches` of zero is raised to one so callers cannot wait forever.
    pub fn new(max_fetches: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        let max_fetches = usize::try_from(max_fetches).unwrap_or(usize::MAX).max(1);
        Self {
            clock,
            max_fetches,
            window,
            recent: Mutex::new(VecDeque::with_capacity(max_fetches.min(64))),
        }
    }

    /// Create a limiter allowing `max_fetches` per rolling minute.
    pub fn per_minute(max_fetches: u32, clock: Arc<dyn Clock>) -> Self {
        Self::new(max_fetches, ONE_MINUTE, clock)
    }

    /// Configured fetch budget per window.
    pub fn max_fetches(&self) -> usize {
        self.max_fetches
    }

    /// Wait until a fetch may start, then record it.
    ///
    /// Returns how long the caller waited.
    pub async fn acquire(&self) -> Duration {
        let started = self.clock.now();

        loop {
            let wait = {
                let now = self.clock.now();
                let mut recent = self.recent.lock().await;

                while let Some(oldest) = recent.front() {
                    if now.saturating_duration_since(*oldest) >= self.window {
                        recent.pop_front();
                    } else {
                        break;
                    }
                }

                if recent.len() < self.max_fetches {
                    recent.push_back(now);
                    return now.saturating_duration_since(started);
                }

                match recent.front() {
                    Some(oldest) => self
                        .window
                        .saturating_sub(now.saturating_duration_since(*oldest)),
                    None => Duration::ZERO,
                }
            };

            tracing::debug!(
                target: "identity.keys.rate_limit",
                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                max_fetches = self.max_fetches,
                "Key-set fetch budget exhausted, waiting"
            );
            self.clock.sleep(wait).await;
        }
    }

    /// Number of fetches recorded in the current window (for diagnostics).
    pub async fn in_window(&self) -> usize {
        let now = self.clock.now();
        let recent = self.recent.lock().await;
        recent
            .iter()
            .filter(|started| now.saturating_duration_since(**started) < self.window)
            .count()
    }
}
