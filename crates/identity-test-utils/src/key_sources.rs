//! In-memory key-set source.

use crate::clock::ManualClock;
use async_trait::async_trait;
use identity::keys::{Clock, Jwk, JwksResponse, KeySetSource};
use identity::KeyResolutionError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// [`KeySetSource`] serving a fixed key set and recording when it was hit.
///
/// Fetch instants are read from the supplied clock, so tests can check the
/// rolling-window limit against the same timeline the limiter uses.
pub struct FakeKeySetSource {
    keys: Vec<Jwk>,
    clock: Arc<dyn Clock>,
    failing: AtomicBool,
    fetches: Mutex<Vec<Instant>>,
}

impl FakeKeySetSource {
    pub fn new(keys: Vec<Jwk>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            keys,
            clock,
            failing: AtomicBool::new(false),
            fetches: Mutex::new(Vec::new()),
        })
    }

    /// Source on a [`ManualClock`].
    pub fn with_manual_clock(keys: Vec<Jwk>, clock: &Arc<ManualClock>) -> Arc<Self> {
        Self::new(keys, Arc::clone(clock) as Arc<dyn Clock>)
    }

    /// Make every following fetch fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    /// Instants at which fetches started, in call order.
    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetches.lock().unwrap().clone()
    }

    /// Largest number of fetches that started within any `window`.
    pub fn max_fetches_within(&self, window: std::time::Duration) -> usize {
        let mut times = self.fetch_times();
        times.sort();
        times
            .iter()
            .enumerate()
            .map(|(i, start)| {
                times[i..]
                    .iter()
                    .take_while(|t| t.saturating_duration_since(*start) < window)
                    .count()
            })
            .max()
            .unwrap_or(0)
    }
}

#[async_trait]
impl KeySetSource for FakeKeySetSource {
    async fn fetch(&self) -> Result<JwksResponse, KeyResolutionError> {
        self.fetches.lock().unwrap().push(self.clock.now());

        if self.failing.load(Ordering::SeqCst) {
            return Err(KeyResolutionError::RemoteFetchFailed(
                "fake key set unavailable".to_string(),
            ));
        }

        Ok(JwksResponse {
            keys: self.keys.clone(),
        })
    }
}
