//! Sliding transmit window adaptation.
//!
//! The window bounds how many unacknowledged parts may be in flight.
//! Additive increase on each clean round, multiplicative decrease on loss.

use tracing::debug;

/// Initial window size.
pub const WINDOW: u16 = 4;

/// Lower window bound.
pub const WINDOW_MIN: u16 = 2;

/// Upper window bound.
pub const WINDOW_MAX: u16 = 75;

/// Adaptive transmit window.
#[derive(Debug, Clone)]
pub struct WindowState {
    window: u16,
}

impl WindowState {
    pub fn new() -> Self {
        Self { window: WINDOW }
    }

    /// Current window size.
    #[must_use]
    pub fn size(&self) -> u16 {
        self.window
    }

    /// Grow by one after a round completed without loss.
    pub fn on_round_complete(&mut self) {
        if self.window < WINDOW_MAX {
            self.window += 1;
            debug!(window = self.window, "resource window grew");
        }
    }

    /// Halve on loss, never below the minimum.
    pub fn on_loss(&mut self) {
        let halved = (self.window / 2).max(WINDOW_MIN);
        if halved != self.window {
            self.window = halved;
            debug!(window = self.window, "resource window halved on loss");
        }
    }
}

impl Default for WindowState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_initial_window() {
        assert_eq!(WindowState::new().size(), WINDOW);
    }

    #[test]
    fn grows_to_max_and_stops() {
        let mut w = WindowState::new();
        for _ in 0..200 {
            w.on_round_complete();
        }
        assert_eq!(w.size(), WINDOW_MAX);
    }

    #[test]
    fn single_loss_halves() {
        let mut w = WindowState::new();
        for _ in 0..36 {
            w.on_round_complete();
        }
        assert_eq!(w.size(), 40);
        w.on_loss();
        assert_eq!(w.size(), 20);
    }

    #[test]
    fn never_shrinks_below_min() {
        let mut w = WindowState::new();
        for _ in 0..10 {
            w.on_loss();
        }
        assert_eq!(w.size(), WINDOW_MIN);
    }

    #[test]
    fn stays_within_bounds_under_random_walk() {
        let mut w = WindowState::new();
        for i in 0..1000 {
            if i % 3 == 0 {
                w.on_loss();
            } else {
                w.on_round_complete();
            }
            assert!((WINDOW_MIN..=WINDOW_MAX).contains(&w.size()));
        }
    }
}
