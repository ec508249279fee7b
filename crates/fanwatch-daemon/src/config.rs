//! Configuration management.

use anyhow::{Context, Result};
use fanwatch_hw::CommandSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of samples the sensor moving average approximates
    #[serde(default = "default_rolling_window")]
    pub temp_rolling_window_size: usize,

    /// Sensor polling interval in milliseconds
    #[serde(default = "default_polling_rate")]
    pub temp_sensor_polling_rate: u64,

    /// Helper command timeout in milliseconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,

    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Configured sensors
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,

    /// Configured fans
    #[serde(default)]
    pub fans: Vec<FanConfig>,
}

/// REST API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Whether the API server is started
    #[serde(default = "default_api_enabled")]
    pub enabled: bool,

    /// Listen address (e.g., "127.0.0.1:9001")
    #[serde(default = "default_api_listen")]
    pub listen: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: default_api_enabled(),
            listen: default_api_listen(),
        }
    }
}

/// A helper command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Path to the executable
    pub exec: String,

    /// Arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl From<&CommandConfig> for CommandSpec {
    fn from(cmd: &CommandConfig) -> Self {
        CommandSpec::new(cmd.exec.clone(), cmd.args.clone())
    }
}

/// Command-based sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Unique sensor id
    pub id: String,

    /// Command printing the sensor value
    #[serde(flatten)]
    pub cmd: CommandConfig,
}

/// Command-based fan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanConfig {
    /// Unique fan id
    pub id: String,

    /// Command printing the PWM duty (0-255)
    pub pwm: CommandConfig,

    /// Command printing the RPM, if the fan reports it
    #[serde(default)]
    pub rpm: Option<CommandConfig>,
}

/// Reasons a configuration is rejected.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("temp_rolling_window_size must be >= 1")]
    ZeroRollingWindow,

    #[error("temp_sensor_polling_rate must be > 0")]
    ZeroPollingRate,

    #[error("command_timeout must be > 0")]
    ZeroCommandTimeout,

    #[error("{kind} id must not be empty")]
    EmptyId { kind: &'static str },

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{kind} {id}: exec must not be empty")]
    EmptyExec { kind: &'static str, id: String },

    #[error("invalid api listen address: {0}")]
    InvalidListen(String),
}

// Default value functions
fn default_rolling_window() -> usize {
    fanwatch_hw::DEFAULT_ROLLING_WINDOW
}

fn default_polling_rate() -> u64 {
    fanwatch_hw::DEFAULT_POLLING_RATE_MS
}

fn default_command_timeout() -> u64 {
    500
}

fn default_api_enabled() -> bool {
    true
}

fn default_api_listen() -> String {
    "127.0.0.1:9001".to_string()
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Checks values that would break the daemon at runtime.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.temp_rolling_window_size == 0 {
            return Err(ValidationError::ZeroRollingWindow);
        }
        if self.temp_sensor_polling_rate == 0 {
            return Err(ValidationError::ZeroPollingRate);
        }
        if self.command_timeout == 0 {
            return Err(ValidationError::ZeroCommandTimeout);
        }

        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            check_entry("sensor", &sensor.id, &mut seen)?;
            check_command("sensor", &sensor.id, &sensor.cmd)?;
        }

        let mut seen = HashSet::new();
        for fan in &self.fans {
            check_entry("fan", &fan.id, &mut seen)?;
            check_command("fan", &fan.id, &fan.pwm)?;
            if let Some(rpm) = &fan.rpm {
                check_command("fan", &fan.id, rpm)?;
            }
        }

        if self.api.listen.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListen(self.api.listen.clone()));
        }

        Ok(())
    }

    /// Sensor polling interval.
    pub fn polling_rate(&self) -> Duration {
        Duration::from_millis(self.temp_sensor_polling_rate)
    }

    /// Helper command timeout.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout)
    }
}

fn check_entry<'a>(
    kind: &'static str,
    id: &'a str,
    seen: &mut HashSet<&'a str>,
) -> std::result::Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyId { kind });
    }
    if !seen.insert(id) {
        return Err(ValidationError::DuplicateId {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn check_command(
    kind: &'static str,
    id: &str,
    cmd: &CommandConfig,
) -> std::result::Result<(), ValidationError> {
    if cmd.exec.trim().is_empty() {
        return Err(ValidationError::EmptyExec {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            temp_rolling_window_size: default_rolling_window(),
            temp_sensor_polling_rate: default_polling_rate(),
            command_timeout: default_command_timeout(),
            api: ApiConfig::default(),
            sensors: Vec::new(),
            fans: Vec::new(),
        }
    }
}
