//! Sensor backed by a helper command.

use super::{MovingAverage, Sensor};
use crate::command::CommandSpec;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Sensor whose value is the standard output of a helper command.
#[derive(Debug)]
pub struct CommandSensor {
    id: String,
    command: CommandSpec,
    timeout: Duration,
    moving_avg: MovingAverage,
}

impl CommandSensor {
    /// Creates a new command sensor.
    pub fn new(id: &str, command: CommandSpec, timeout: Duration) -> Self {
        Self {
            id: id.to_string(),
            command,
            timeout,
            moving_avg: MovingAverage::default(),
        }
    }

    /// Returns the command this sensor runs.
    pub fn command(&self) -> &CommandSpec {
        &self.command
    }
}

#[async_trait]
impl Sensor for CommandSensor {
    fn id(&self) -> &str {
        &self.id
    }

    async fn value(&self) -> Result<f64> {
        let output = self.command.run(self.timeout).await?;
        let trimmed = output.trim();
        trimmed.parse::<f64>().map_err(|e| Error::SampleRead {
            id: self.id.clone(),
            reason: format!("cannot parse {:?}: {}", trimmed, e),
        })
    }

    fn moving_avg(&self) -> f64 {
        self.moving_avg.get()
    }

    fn set_moving_avg(&self, avg: f64) {
        self.moving_avg.set(avg);
    }
}
