// src/session/rate_limiter.rs

use rand::Rng;
use std::time::Duration;

/// Randomized pacing between page actions. One instance is configured per
/// pipeline and handed to the session manager and pagination controller, so
/// every deliberate delay comes from the same bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    min: Duration,
    max: Duration,
}

impl RateLimiter {
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// No pauses at all.
    pub const fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }

    pub fn next_delay(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    pub async fn pause(&self) {
        self.pause_scaled(1).await;
    }

    /// Pause with both bounds multiplied; used for longer gaps such as the
    /// settle delay after launch and the gap between partner listings.
    pub async fn pause_scaled(&self, factor: u32) {
        let delay = self.next_delay() * factor;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_millis(800, 2500)
    }
}
