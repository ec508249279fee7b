//! Fan capability.
//!
//! Fans are only queried here; nothing in this crate drives them.

mod command;

pub use command::CommandFan;

use crate::Result;
use async_trait::async_trait;

/// Optional fan features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Fan reports its speed in RPM.
    RpmSensor,
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Feature::RpmSensor => write!(f, "rpm-sensor"),
        }
    }
}

/// Trait for all fans.
#[async_trait]
pub trait Fan: Send + Sync {
    /// Returns the stable fan id.
    fn id(&self) -> &str;

    /// Reads the current PWM duty (0-255).
    async fn pwm(&self) -> Result<u8>;

    /// Reads the current speed in RPM.
    async fn rpm(&self) -> Result<u32>;

    /// Returns true if the fan has `feature`.
    fn supports(&self, feature: Feature) -> bool;
}
