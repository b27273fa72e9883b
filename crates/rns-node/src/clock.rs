//! Host clock.
//!
//! The engines never sample time; this is the single place the host does.
//! Monotonic seconds feed every engine call, wall-clock seconds only feed
//! announce random hashes and persisted `last_seen` values.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Monotonic seconds since process start, as the engines expect.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    #[must_use]
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock Unix seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
