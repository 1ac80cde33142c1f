//! Simulated network latency.

use rand::Rng;
use std::time::Duration;

use crate::config::DelayRange;

/// Sleeps each request for a uniformly sampled duration.
#[derive(Debug, Clone, Copy)]
pub struct DelaySimulator {
    enabled: bool,
}

impl DelaySimulator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pick a duration in `[min, max]`, or 0 when disabled. An inverted range
    /// is sampled between its bounds.
    // TODO: allow non-uniform distributions (e.g. normal around the midpoint)
    pub fn sample(&self, range: DelayRange) -> u64 {
        let (low, high) = (range.min.min(range.max), range.min.max(range.max));
        if !self.enabled || high == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(low..=high)
    }

    /// Suspend the current task for a sampled duration and return it in ms.
    /// Only the calling request waits; the runtime keeps serving others.
    pub async fn delay(&self, range: DelayRange) -> u64 {
        let ms = self.sample(range);
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        ms
    }
}

impl Default for DelaySimulator {
    fn default() -> Self {
        Self::new(true)
    }
}
