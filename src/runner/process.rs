//! Plain subprocess runner - no environment isolation beyond the workspace

use crate::runner::{wait_for, EnvironmentManager, ExitInfo, Invocation, RunnerError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Runs a local step directly as a program
///
/// The program is the entry point itself when it is a file, otherwise
/// `<entry_point>/<interface>`. Parameters become `--name value` arguments.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Optional interpreter the program is passed to, e.g. `sh` or `python`
    interpreter: Option<String>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: Some(interpreter.into()),
        }
    }

    /// Locate the program for an invocation
    pub fn program_path(invocation: &Invocation) -> Result<PathBuf, RunnerError> {
        if invocation.entry_point.contains("://") {
            return Err(RunnerError::Unsupported(invocation.entry_point.clone()));
        }

        let base = PathBuf::from(&invocation.entry_point);
        if base.is_file() {
            Ok(base)
        } else {
            Ok(base.join(&invocation.interface))
        }
    }

    pub fn build_args(invocation: &Invocation) -> Vec<String> {
        invocation
            .parameters
            .iter()
            .flat_map(|(name, value)| [format!("--{}", name), value.to_string()])
            .collect()
    }
}

#[async_trait]
impl EnvironmentManager for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitInfo, RunnerError> {
        let program = Self::program_path(invocation)?;
        let program_str = program.display().to_string();
        debug!(
            "Running {} directly (env manager '{}' is not applied)",
            program_str, invocation.env_manager
        );

        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(&program);
                command
            }
            None => Command::new(&program),
        };
        command.args(Self::build_args(invocation));

        wait_for(command, &program_str, invocation).await
    }
}
