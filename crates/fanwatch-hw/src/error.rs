//! Error types for the fanwatch hardware library.

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when sampling sensors or running helper commands.
#[derive(Error, Debug)]
pub enum Error {
    /// Executable is missing or not executable by this process.
    /// Raised before any process is spawned.
    #[error("cannot execute {path}: {reason}")]
    Configuration { path: String, reason: String },

    /// Helper command exceeded its deadline and was killed.
    #[error("command timed out after {timeout:?}: {path}")]
    Timeout { path: String, timeout: Duration },

    /// Helper command could not be spawned or exited non-zero.
    #[error("command {path} failed ({status}): {stderr}")]
    Execution {
        path: String,
        status: String,
        stderr: String,
    },

    /// Sensor produced something that is not a value.
    #[error("failed to read sensor {id}: {reason}")]
    SampleRead { id: String, reason: String },

    /// Fan was queried for a feature it does not have.
    #[error("fan {id} does not support {feature}")]
    UnsupportedFeature { id: String, feature: String },

    /// Rolling window size must be at least 1.
    #[error("invalid rolling window size: {0} (must be >= 1)")]
    InvalidWindowSize(usize),
}
