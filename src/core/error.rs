//! Error taxonomy for a pipeline run

use crate::runner::ExitInfo;
use thiserror::Error;

/// Errors that abort a pipeline run
///
/// None of these are recovered internally; every variant surfaces to the
/// top-level caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown step: '{0}'")]
    UnknownStep(String),

    #[error("Missing configuration value: {0}")]
    MissingConfig(String),

    #[error("Invalid configuration value at {path}: {reason}")]
    InvalidConfig { path: String, reason: String },

    #[error("Invalid artifact reference '{0}', expected <name>:<tag>")]
    InvalidArtifactReference(String),

    #[error("Step '{step_id}' failed: {exit_info}")]
    StepExecution { step_id: String, exit_info: ExitInfo },

    #[error("Step '{step_id}' was interrupted by a termination signal")]
    Interrupted { step_id: String },

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),
}

impl PipelineError {
    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Interrupted { .. } => 130,
            _ => 1,
        }
    }

    /// The step this error is attributed to, if any
    pub fn step_id(&self) -> Option<&str> {
        match self {
            PipelineError::StepExecution { step_id, .. }
            | PipelineError::Interrupted { step_id } => Some(step_id),
            _ => None,
        }
    }
}
