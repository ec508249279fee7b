//! Application state management.

use anyhow::{Context, Result};
use fanwatch_hw::monitor::prime_sensor;
use fanwatch_hw::{CommandFan, CommandSensor, Fan, RollingWindow, Sensor, SensorMonitor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::metrics::Metrics;

/// Shared daemon state.
pub struct AppState {
    config_path: PathBuf,
    config: Mutex<Config>,
    window: RollingWindow,
    sensors: Vec<Arc<dyn Sensor>>,
    fans: Vec<Arc<dyn Fan>>,
    metrics: Metrics,
}

impl AppState {
    /// Builds sensors and fans from a validated configuration.
    pub fn new(config: Config, config_path: &Path) -> Result<Self> {
        let timeout = config.command_timeout();

        let sensors = config
            .sensors
            .iter()
            .map(|s| Arc::new(CommandSensor::new(&s.id, (&s.cmd).into(), timeout)) as Arc<dyn Sensor>)
            .collect();

        let fans = config
            .fans
            .iter()
            .map(|f| {
                Arc::new(CommandFan::new(
                    &f.id,
                    (&f.pwm).into(),
                    f.rpm.as_ref().map(Into::into),
                    timeout,
                )) as Arc<dyn Fan>
            })
            .collect();

        Self::with_devices(config, config_path, sensors, fans)
    }

    /// Builds state around already constructed devices.
    pub fn with_devices(
        config: Config,
        config_path: &Path,
        sensors: Vec<Arc<dyn Sensor>>,
        fans: Vec<Arc<dyn Fan>>,
    ) -> Result<Self> {
        let window = RollingWindow::new(config.temp_rolling_window_size)
            .context("Invalid rolling window size")?;
        let metrics = Metrics::new().context("Failed to create metrics registry")?;

        Ok(Self {
            config_path: config_path.to_path_buf(),
            config: Mutex::new(config),
            window,
            sensors,
            fans,
            metrics,
        })
    }

    /// Returns all sensors.
    pub fn sensors(&self) -> &[Arc<dyn Sensor>] {
        &self.sensors
    }

    /// Looks up a sensor by id.
    pub fn sensor(&self, id: &str) -> Option<&Arc<dyn Sensor>> {
        self.sensors.iter().find(|s| s.id() == id)
    }

    /// Returns all fans.
    pub fn fans(&self) -> &[Arc<dyn Fan>] {
        &self.fans
    }

    /// Looks up a fan by id.
    pub fn fan(&self, id: &str) -> Option<&Arc<dyn Fan>> {
        self.fans.iter().find(|f| f.id() == id)
    }

    /// Returns the Prometheus metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Returns the shared rolling window.
    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Seeds every sensor's moving average with an initial reading.
    pub async fn prime_sensors(&self) {
        for sensor in &self.sensors {
            match prime_sensor(sensor.as_ref()).await {
                Ok(value) => info!("Sensor {} starts at {}", sensor.id(), value),
                Err(e) => warn!("Initial read of sensor {} failed: {}", sensor.id(), e),
            }
        }
    }

    /// Spawns one monitor task per sensor.
    pub fn spawn_monitors(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let polling_rate = self.lock_config().polling_rate();
        self.sensors
            .iter()
            .map(|sensor| {
                info!("Starting sensor monitor for sensor {}", sensor.id());
                let monitor = SensorMonitor::new(sensor.clone(), polling_rate, self.window.clone());
                tokio::spawn(monitor.run(cancel.clone()))
            })
            .collect()
    }

    /// Re-reads the configuration file.
    ///
    /// Only the rolling window size is applied live; other changes are
    /// reported and need a restart. On any error the running settings stay.
    pub fn reload(&self) -> Result<()> {
        let new = Config::load(&self.config_path)?;
        new.validate().context("Invalid configuration")?;

        let mut current = self.lock_config();
        self.window.set(new.temp_rolling_window_size)?;
        info!(
            "Rolling window size is now {}",
            new.temp_rolling_window_size
        );

        let applied = Config {
            temp_rolling_window_size: current.temp_rolling_window_size,
            ..new.clone()
        };
        if applied != *current {
            warn!("Configuration changes other than temp_rolling_window_size need a restart");
        }
        current.temp_rolling_window_size = new.temp_rolling_window_size;
        Ok(())
    }

    fn lock_config(&self) -> std::sync::MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(|e| e.into_inner())
    }
}
