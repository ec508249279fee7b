//! Rolling average helpers.
//!
//! The average is an exponentially weighted approximation of a simple moving
//! average over `n` samples. No sample history is kept.

use crate::{Error, Result};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Folds `sample` into `previous` with weight `1/window`.
///
/// A window of 1 returns `sample` unchanged.
pub fn update_simple_moving_avg(previous: f64, window: NonZeroUsize, sample: f64) -> f64 {
    let n = window.get();
    if n == 1 {
        return sample;
    }
    previous + (sample - previous) / n as f64
}

/// Process-wide rolling window size, shared between monitors and the
/// configuration owner.
///
/// Monitors read it on every cycle, so a [`set`](RollingWindow::set) takes
/// effect on the next tick.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    size: Arc<AtomicUsize>,
}

impl RollingWindow {
    /// Creates a window handle. Zero is rejected.
    pub fn new(size: usize) -> Result<Self> {
        let size = NonZeroUsize::new(size).ok_or(Error::InvalidWindowSize(size))?;
        Ok(Self {
            size: Arc::new(AtomicUsize::new(size.get())),
        })
    }

    /// Returns the current window size.
    pub fn get(&self) -> NonZeroUsize {
        // Only non-zero values are ever stored.
        NonZeroUsize::new(self.size.load(Ordering::Relaxed)).unwrap_or(NonZeroUsize::MIN)
    }

    /// Replaces the window size for every holder of this handle.
    pub fn set(&self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::InvalidWindowSize(size));
        }
        self.size.store(size, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: usize) -> NonZeroUsize {
        NonZeroUsize::new(v).unwrap()
    }

    #[test]
    fn test_window_of_one_returns_sample() {
        for (prev, sample) in [(0.0, 42.5), (0.1, 0.3), (-7.25, 1e9), (55.0, 55.0)] {
            assert_eq!(update_simple_moving_avg(prev, n(1), sample), sample);
        }
    }

    #[test]
    fn test_unchanged_sample_is_fixed_point() {
        for window in [1, 2, 7, 100] {
            assert_eq!(update_simple_moving_avg(37.3, n(window), 37.3), 37.3);
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(update_simple_moving_avg(10.0, n(5), 20.0), 12.0);
        assert_eq!(update_simple_moving_avg(100.0, n(10), 0.0), 90.0);
    }

    #[test]
    fn test_rolling_window_rejects_zero() {
        assert!(matches!(
            RollingWindow::new(0),
            Err(Error::InvalidWindowSize(0))
        ));

        let window = RollingWindow::new(3).unwrap();
        assert!(window.set(0).is_err());
        assert_eq!(window.get().get(), 3);
    }

    #[test]
    fn test_rolling_window_shared_between_clones() {
        let window = RollingWindow::new(10).unwrap();
        let other = window.clone();
        other.set(4).unwrap();
        assert_eq!(window.get().get(), 4);
    }
}
