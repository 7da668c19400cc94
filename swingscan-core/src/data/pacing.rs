//! Request pacing for rate-limited providers.
//!
//! Polygon's free tier allows five requests a minute. Rather than sleeping a
//! fixed amount after every ticker, the pacer waits only for whatever is left
//! of the minimum interval since the previous request.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Free-tier interval: 5 requests per minute.
pub const FREE_TIER_INTERVAL: Duration = Duration::from_secs(12);

#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// A pacer that never waits.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn free_tier() -> Self {
        Self::new(FREE_TIER_INTERVAL)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// How long a request issued now would have to wait.
    pub fn time_until_ready(&self) -> Duration {
        let last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        match *last {
            Some(at) => self.min_interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Block until the next request may go out, then mark it as sent.
    ///
    /// Holding the lock across the sleep serialises concurrent callers.
    pub fn wait(&self) -> Duration {
        let mut last = self.last_request.lock().unwrap_or_else(|e| e.into_inner());
        let delay = match *last {
            Some(at) => self.min_interval.saturating_sub(at.elapsed()),
            None => Duration::ZERO,
        };
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "pacing request");
            std::thread::sleep(delay);
        }
        *last = Some(Instant::now());
        delay
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::unpaced()
    }
}
