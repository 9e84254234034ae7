//! Manually advanced clock for rate-limit tests.

use async_trait::async_trait;
use identity::keys::Clock;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// [`Clock`] whose time only moves when [`ManualClock::advance`] is called.
///
/// Sleepers park until the clock has been advanced past their deadline.
///
/// # Example
/// ```rust,ignore
/// let clock = Arc::new(ManualClock::new());
/// let limiter = FetchRateLimiter::per_minute(5, clock.clone());
/// // ... exhaust the budget, then:
/// clock.advance(Duration::from_secs(60));
/// ```
pub struct ManualClock {
    base: Instant,
    offset: watch::Sender<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        let (offset, _) = watch::channel(Duration::ZERO);
        Self {
            base: Instant::now(),
            offset,
        }
    }

    /// Move time forward, waking every sleeper whose deadline has passed.
    pub fn advance(&self, by: Duration) {
        self.offset.send_modify(|offset| *offset += by);
    }

    /// Time advanced since construction.
    pub fn elapsed(&self) -> Duration {
        *self.offset.borrow()
    }

    /// Number of callers currently parked in [`Clock::sleep`].
    pub fn sleepers(&self) -> usize {
        self.offset.receiver_count()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        let deadline = self.elapsed() + duration;
        let mut rx = self.offset.subscribe();
        loop {
            if *rx.borrow_and_update() >= deadline {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Yield until `condition` holds, failing the test if it never does.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
