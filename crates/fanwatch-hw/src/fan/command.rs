//! Fan backed by helper commands.

use super::{Fan, Feature};
use crate::command::CommandSpec;
use crate::{Error, Result};
use async_trait::async_trait;
use std::str::FromStr;
use std::time::Duration;

/// Fan whose PWM and RPM are read through helper commands.
#[derive(Debug)]
pub struct CommandFan {
    id: String,
    pwm: CommandSpec,
    rpm: Option<CommandSpec>,
    timeout: Duration,
}

impl CommandFan {
    /// Creates a new command fan. RPM is only supported if `rpm` is given.
    pub fn new(id: &str, pwm: CommandSpec, rpm: Option<CommandSpec>, timeout: Duration) -> Self {
        Self {
            id: id.to_string(),
            pwm,
            rpm,
            timeout,
        }
    }

    async fn read<T>(&self, command: &CommandSpec) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let output = command.run(self.timeout).await?;
        let trimmed = output.trim();
        trimmed.parse::<T>().map_err(|e| Error::SampleRead {
            id: self.id.clone(),
            reason: format!("cannot parse {:?}: {}", trimmed, e),
        })
    }
}

#[async_trait]
impl Fan for CommandFan {
    fn id(&self) -> &str {
        &self.id
    }

    async fn pwm(&self) -> Result<u8> {
        self.read(&self.pwm).await
    }

    async fn rpm(&self) -> Result<u32> {
        match &self.rpm {
            Some(command) => self.read(command).await,
            None => Err(Error::UnsupportedFeature {
                id: self.id.clone(),
                feature: Feature::RpmSensor.to_string(),
            }),
        }
    }

    fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::RpmSensor => self.rpm.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo(value: &str) -> CommandSpec {
        CommandSpec::new("/bin/sh", vec!["-c".to_string(), format!("echo {value}")])
    }

    #[tokio::test]
    async fn test_reads_pwm_and_rpm() {
        let fan = CommandFan::new("cpu_fan", echo("128"), Some(echo("1450")), Duration::from_secs(5));
        assert!(fan.supports(Feature::RpmSensor));
        assert_eq!(fan.pwm().await.unwrap(), 128);
        assert_eq!(fan.rpm().await.unwrap(), 1450);
    }

    #[tokio::test]
    async fn test_rpm_without_command_is_unsupported() {
        let fan = CommandFan::new("case_fan", echo("90"), None, Duration::from_secs(5));
        assert!(!fan.supports(Feature::RpmSensor));
        let err = fan.rpm().await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature { .. }));
        assert_eq!(err.to_string(), "fan case_fan does not support rpm-sensor");
    }

    #[tokio::test]
    async fn test_pwm_out_of_range_is_sample_read_error() {
        let fan = CommandFan::new("cpu_fan", echo("300"), None, Duration::from_secs(5));
        assert!(matches!(
            fan.pwm().await.unwrap_err(),
            Error::SampleRead { .. }
        ));
    }
}
