//! Per-sensor background sampling.
//!
//! Each sensor gets one [`SensorMonitor`] running on its own task. The
//! monitor samples the sensor on a fixed interval and folds every successful
//! reading into the sensor's moving average. Read failures are logged and
//! skipped; the task only ends when its cancellation token fires.

use crate::average::{update_simple_moving_avg, RollingWindow};
use crate::sensor::Sensor;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodic sampler for one sensor.
pub struct SensorMonitor {
    sensor: Arc<dyn Sensor>,
    polling_rate: Duration,
    window: RollingWindow,
}

impl SensorMonitor {
    /// Creates a monitor. `polling_rate` must be non-zero.
    pub fn new(sensor: Arc<dyn Sensor>, polling_rate: Duration, window: RollingWindow) -> Self {
        Self {
            sensor,
            polling_rate,
            window,
        }
    }

    /// Returns the monitored sensor.
    pub fn sensor(&self) -> &Arc<dyn Sensor> {
        &self.sensor
    }

    /// Samples until `cancel` fires.
    ///
    /// The first sample is taken one polling interval after the call. A cycle
    /// that has started always completes; cancellation is checked before
    /// each new cycle and wins over a ready tick.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval_at(Instant::now() + self.polling_rate, self.polling_rate);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Stopping sensor monitor for sensor {}...", self.sensor.id());
                    return;
                }
                _ = tick.tick() => {
                    if let Err(e) = update_sensor(self.sensor.as_ref(), &self.window).await {
                        warn!("Error updating sensor {}: {}", self.sensor.id(), e);
                    }
                }
            }
        }
    }
}

/// Reads `sensor` once and folds the value into its moving average.
///
/// Returns the new average. On error the average is left untouched.
pub async fn update_sensor(sensor: &dyn Sensor, window: &RollingWindow) -> Result<f64> {
    let value = sensor.value().await?;
    let last_avg = sensor.moving_avg();
    let new_avg = update_simple_moving_avg(last_avg, window.get(), value);
    sensor.set_moving_avg(new_avg);
    debug!("Sensor {}: value={} avg={}", sensor.id(), value, new_avg);
    Ok(new_avg)
}

/// Seeds the moving average with one reading so it does not start from zero.
pub async fn prime_sensor(sensor: &dyn Sensor) -> Result<f64> {
    let value = sensor.value().await?;
    sensor.set_moving_avg(value);
    Ok(value)
}
