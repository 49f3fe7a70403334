//! Step invoker - runs one step to completion

use crate::core::{EntryPoint, EnvironmentScope, PipelineError, Step};
use crate::execution::workspace::Workspace;
use crate::runner::{
    BoundParameters, EnvManagerKind, EnvironmentManager, ExitInfo, Invocation, DEFAULT_INTERFACE,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Turns an entry point into a locator the environment manager understands
#[derive(Debug, Clone)]
pub struct EntryPointResolver {
    /// Base for local step directories
    pub project_root: PathBuf,
    /// Base for hosted components
    pub components_repository: Option<String>,
}

impl EntryPointResolver {
    pub fn resolve(&self, entry_point: &EntryPoint) -> Result<String, PipelineError> {
        match entry_point {
            EntryPoint::Local { path } => {
                // Steps run with the workspace as their cwd, so a relative
                // project root would resolve inside it
                let dir = std::path::absolute(self.project_root.join(path)).map_err(|e| {
                    PipelineError::InvalidConfig {
                        path: "project_root".to_string(),
                        reason: format!("cannot resolve {}: {}", self.project_root.display(), e),
                    }
                })?;
                Ok(dir.display().to_string())
            }
            EntryPoint::Component { name } => {
                let base = self.components_repository.as_deref().ok_or_else(|| {
                    PipelineError::MissingConfig("main.components_repository".to_string())
                })?;
                Ok(format!("{}/{}", base.trim_end_matches('/'), name))
            }
        }
    }
}

/// Runs steps through an environment manager
pub struct StepInvoker<M> {
    manager: M,
    resolver: EntryPointResolver,
}

impl<M: EnvironmentManager> StepInvoker<M> {
    pub fn new(manager: M, resolver: EntryPointResolver) -> Self {
        Self { manager, resolver }
    }

    /// Build the invocation for a step without running it
    pub fn prepare(
        &self,
        step: &Step,
        params: BoundParameters,
        workspace: &Workspace,
        env_manager: EnvManagerKind,
        scope: &EnvironmentScope,
    ) -> Result<Invocation, PipelineError> {
        Ok(Invocation {
            step_id: step.id().to_string(),
            entry_point: self.resolver.resolve(&step.entry_point)?,
            interface: DEFAULT_INTERFACE.to_string(),
            version: step.version.clone(),
            env_manager,
            parameters: params,
            working_dir: workspace.path().to_path_buf(),
            env: scope
                .vars()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    /// Run a step and wait for it to finish.
    ///
    /// Any outcome other than a clean zero exit is a `StepExecution` error.
    /// Cancelling `cancel` while waiting drops the running process (killing
    /// its process group) and yields `Interrupted`.
    pub async fn invoke(
        &self,
        step: &Step,
        params: BoundParameters,
        workspace: &Workspace,
        env_manager: EnvManagerKind,
        scope: &EnvironmentScope,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let invocation = self.prepare(step, params, workspace, env_manager, scope)?;
        info!(
            "Invoking step {} from {} ({})",
            invocation.step_id, invocation.entry_point, env_manager
        );

        let exit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Run cancelled while running step {}", step.id());
                return Err(PipelineError::Interrupted {
                    step_id: step.id().to_string(),
                });
            }
            result = self.manager.run(&invocation) => match result {
                Ok(exit) => exit,
                Err(e) => ExitInfo::from(e),
            },
        };

        if exit.is_success() {
            info!("Step {} finished", step.id());
            Ok(())
        } else {
            error!("Step {} failed: {}", step.id(), exit);
            Err(PipelineError::StepExecution {
                step_id: step.id().to_string(),
                exit_info: exit,
            })
        }
    }
}
