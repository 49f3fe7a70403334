//! Process termination info and runner errors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::ExitStatus;
use thiserror::Error;

/// Error types for environment manager operations
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("lost track of '{program}': {reason}")]
    Wait { program: String, reason: String },

    #[error("entry point '{0}' is not supported by this environment manager")]
    Unsupported(String),
}

/// How a step's process ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitInfo {
    Code(i32),
    /// Terminated by a signal (unix only)
    Signal(i32),
    /// The process never started
    SpawnFailed(String),
}

impl ExitInfo {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitInfo::Code(0))
    }
}

impl From<ExitStatus> for ExitInfo {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitInfo::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitInfo::Signal(signal);
            }
        }

        ExitInfo::Code(-1)
    }
}

impl From<RunnerError> for ExitInfo {
    fn from(err: RunnerError) -> Self {
        ExitInfo::SpawnFailed(err.to_string())
    }
}

impl fmt::Display for ExitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitInfo::Code(code) => write!(f, "exit code {}", code),
            ExitInfo::Signal(signal) => write!(f, "terminated by signal {}", signal),
            ExitInfo::SpawnFailed(reason) => write!(f, "could not start: {}", reason),
        }
    }
}
