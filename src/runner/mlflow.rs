//! MLflow project runner - calls `mlflow run` as a subprocess

use crate::runner::{wait_for, EnvironmentManager, ExitInfo, Invocation, RunnerError};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs each step as an MLflow project, letting MLflow build the isolated
/// environment
#[derive(Debug, Clone)]
pub struct MlflowRunner {
    /// Path to the mlflow executable
    executable: String,
}

impl Default for MlflowRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MlflowRunner {
    /// Use `mlflow` from PATH
    pub fn new() -> Self {
        Self::with_executable("mlflow")
    }

    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Command-line arguments for `mlflow`, without the executable
    ///
    /// `run <uri> -e <interface> --env-manager <kind> [-v <version>] -P k=v ...`
    pub fn build_args(invocation: &Invocation) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            invocation.entry_point.clone(),
            "-e".to_string(),
            invocation.interface.clone(),
            "--env-manager".to_string(),
            invocation.env_manager.as_str().to_string(),
        ];

        if let Some(version) = &invocation.version {
            args.push("-v".to_string());
            args.push(version.clone());
        }

        for (name, value) in &invocation.parameters {
            args.push("-P".to_string());
            args.push(format!("{}={}", name, value));
        }

        args
    }
}

#[async_trait]
impl EnvironmentManager for MlflowRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ExitInfo, RunnerError> {
        let args = Self::build_args(invocation);
        debug!("{} {}", self.executable, args.join(" "));

        let mut command = Command::new(&self.executable);
        command.args(&args);

        let exit = wait_for(command, &self.executable, invocation).await?;
        if !exit.is_success() {
            warn!("mlflow run for step {} ended with {}", invocation.step_id, exit);
        }
        Ok(exit)
    }
}
