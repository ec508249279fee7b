//! Sensor capability.
//!
//! A sensor exposes a readable value and a moving average that its monitor
//! keeps up to date.

mod command;

pub use command::CommandSensor;

use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for all sensors.
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Returns the stable sensor id.
    fn id(&self) -> &str;

    /// Reads the current value.
    async fn value(&self) -> Result<f64>;

    /// Returns the current moving average.
    fn moving_avg(&self) -> f64;

    /// Stores a new moving average.
    ///
    /// Only the sensor's own monitor calls this.
    fn set_moving_avg(&self, avg: f64);
}

/// Lock-free `f64` cell for a sensor's moving average.
///
/// Single writer, any number of readers.
#[derive(Debug, Default)]
pub struct MovingAverage(AtomicU64);

impl MovingAverage {
    /// Creates a cell holding `value`.
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    /// Returns the stored value.
    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    /// Stores `value`.
    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average_default_is_zero() {
        assert_eq!(MovingAverage::default().get(), 0.0);
    }

    #[test]
    fn test_moving_average_set_get() {
        let avg = MovingAverage::new(1.5);
        assert_eq!(avg.get(), 1.5);
        avg.set(-42.125);
        assert_eq!(avg.get(), -42.125);
    }
}
