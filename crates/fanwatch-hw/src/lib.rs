//! fanwatch hardware library
//!
//! Sensor sampling core for fan control daemons: rolling averages, one
//! cancellable monitor task per sensor, and bounded execution of helper
//! commands for command-based sensor and fan backends.

pub mod average;
pub mod command;
pub mod error;
pub mod fan;
pub mod monitor;
pub mod sensor;

pub use average::{update_simple_moving_avg, RollingWindow};
pub use command::CommandSpec;
pub use error::{Error, Result};
pub use fan::{CommandFan, Fan, Feature};
pub use monitor::SensorMonitor;
pub use sensor::{CommandSensor, MovingAverage, Sensor};

/// Default rolling window size.
pub const DEFAULT_ROLLING_WINDOW: usize = 10;

/// Default sensor polling interval in milliseconds.
pub const DEFAULT_POLLING_RATE_MS: u64 = 200;
