//! Bounded execution of external helper programs.
//!
//! Used by command-based sensor and fan backends. Every call is independent:
//! nothing is shared between invocations, so monitors may run commands
//! concurrently.

use crate::{Error, Result};
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// A helper program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Path to the executable.
    pub exec: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a new command spec.
    pub fn new(exec: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            exec: exec.into(),
            args,
        }
    }

    /// Runs this command with the given deadline.
    pub async fn run(&self, timeout: Duration) -> Result<String> {
        run(&self.exec, &self.args, timeout).await
    }
}

/// Runs `executable` with `args`, killing it if it outlives `timeout`.
///
/// Returns standard output with one trailing newline removed.
pub async fn run(executable: &str, args: &[String], timeout: Duration) -> Result<String> {
    check_executable(Path::new(executable)).map_err(|reason| Error::Configuration {
        path: executable.to_string(),
        reason,
    })?;

    debug!("Executing: {} {:?}", executable, args);

    let child = Command::new(executable)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            warn!("Command failed to execute: {}: {}", executable, e);
            Error::Execution {
                path: executable.to_string(),
                status: "spawn failed".to_string(),
                stderr: e.to_string(),
            }
        })?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| Error::Execution {
            path: executable.to_string(),
            status: "wait failed".to_string(),
            stderr: e.to_string(),
        })?,
        Err(_) => {
            warn!("Command timed out: {}", executable);
            return Err(Error::Timeout {
                path: executable.to_string(),
                timeout,
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        warn!("Command failed to execute: {}: {}", executable, stderr);
        return Err(Error::Execution {
            path: executable.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.ends_with('\n') {
        stdout.pop();
    }
    Ok(stdout)
}

/// Checks that `path` is a regular file the current process may execute.
fn check_executable(path: &Path) -> std::result::Result<(), String> {
    let metadata = std::fs::metadata(path).map_err(|e| e.to_string())?;
    if !metadata.is_file() {
        return Err("not a regular file".to_string());
    }

    let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| e.to_string())?;
    // SAFETY: c_path is a valid NUL-terminated string that outlives the call.
    let rc = unsafe { libc::access(c_path.as_ptr(), libc::X_OK) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().to_string());
    }

    Ok(())
}
