//! Orchestrator - runs the selected steps of the catalog in order

use crate::core::{
    ConfigTree, EnvironmentScope, ExecutionStatus, PipelineError, RunContext, RunPhase, RunSummary,
    StepKind, StepRecord, StepRegistry, StepState,
};
use crate::execution::binder::ParameterBinder;
use crate::execution::invoker::{EntryPointResolver, StepInvoker};
use crate::execution::selector::StepSelector;
use crate::execution::workspace::WorkspaceManager;
use crate::runner::{EnvManagerKind, EnvironmentManager};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        run_id: Uuid,
        project: String,
        run_group: String,
    },
    StepsResolved {
        steps: Vec<StepKind>,
    },
    WorkspaceAcquired {
        path: PathBuf,
    },
    StepSkipped {
        step: StepKind,
    },
    StepStarted {
        step: StepKind,
        ordinal: u32,
    },
    StepCompleted {
        step: StepKind,
    },
    StepFailed {
        step: StepKind,
        error: String,
    },
    RunFinished {
        run_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Settings that are not part of the pipeline configuration
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub env_manager: EnvManagerKind,
    /// Base directory for local step entry points
    pub project_root: PathBuf,
    /// Parent for the run workspace; system temp dir when unset
    pub workspace_root: Option<PathBuf>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            env_manager: EnvManagerKind::default(),
            project_root: PathBuf::from("."),
            workspace_root: None,
        }
    }
}

/// Result of a run: the summary is always available, the error only when
/// the run aborted
#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub error: Option<PipelineError>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<RunSummary, PipelineError> {
        match self.error {
            None => Ok(self.summary),
            Some(e) => Err(e),
        }
    }
}

/// Main pipeline orchestrator
pub struct Orchestrator<M> {
    registry: StepRegistry,
    manager: M,
    options: OrchestratorOptions,
    event_handlers: Vec<EventHandler>,
}

impl<M: EnvironmentManager> Orchestrator<M> {
    pub fn new(manager: M, options: OrchestratorOptions) -> Self {
        Self {
            registry: StepRegistry::standard(),
            manager,
            options,
            event_handlers: Vec::new(),
        }
    }

    /// Replace the step catalog
    pub fn with_registry(mut self, registry: StepRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(&ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(&event);
        }
    }

    /// Execute one run against `config`, aborting on Ctrl-C or SIGTERM.
    ///
    /// Steps run strictly one after another in ordinal order; the first
    /// failure aborts the run. The workspace is removed on every exit path.
    pub async fn run(&self, config: &ConfigTree) -> RunOutcome {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let listener = tokio::spawn(async move {
            shutdown_signal().await;
            warn!("Termination signal received");
            trigger.cancel();
        });

        let outcome = self.run_until_cancelled(config, cancel).await;
        listener.abort();
        outcome
    }

    /// Execute one run that stops with `Interrupted` once `cancel` fires.
    ///
    /// A step still running at that point is killed; a step not yet started
    /// is never started.
    pub async fn run_until_cancelled(
        &self,
        config: &ConfigTree,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let mut summary = RunSummary::new(run_id);
        summary.status = ExecutionStatus::Running;

        let error = match self.prepare(run_id, config, &mut summary) {
            Ok(ctx) => {
                let result = self.run_steps(&ctx, config, &mut summary, &cancel).await;
                let RunContext { workspace, .. } = ctx;
                workspace.release();
                result.err()
            }
            Err(e) => Some(e),
        };

        match &error {
            None => {
                transition(&mut summary, RunPhase::Completed);
                summary.status = ExecutionStatus::Completed;
            }
            Some(e) => {
                error!("Run {} aborted: {}", run_id, e);
                transition(&mut summary, RunPhase::Aborted);
                summary.status = match e {
                    PipelineError::Interrupted { .. } => ExecutionStatus::Cancelled,
                    _ => ExecutionStatus::Failed,
                };
                summary.error = Some(e.to_string());
            }
        }
        summary.finished_at = Some(Utc::now());

        info!("Run {} finished: {:?}", run_id, summary.status);
        self.emit_event(ExecutionEvent::RunFinished {
            run_id,
            status: summary.status,
        });

        RunOutcome { summary, error }
    }

    /// Bind the environment, resolve the active steps, acquire the workspace
    fn prepare(
        &self,
        run_id: Uuid,
        config: &ConfigTree,
        summary: &mut RunSummary,
    ) -> Result<RunContext, PipelineError> {
        let main = config.main_settings()?;

        let environment = EnvironmentScope::from_settings(&main);
        transition(summary, RunPhase::EnvironmentBound);
        info!(
            "Starting run {} (project {}, group {})",
            run_id, main.project_name, main.experiment_name
        );
        self.emit_event(ExecutionEvent::RunStarted {
            run_id,
            project: main.project_name.clone(),
            run_group: main.experiment_name.clone(),
        });

        let active_steps = StepSelector::resolve(&main.steps, &self.registry)?;
        summary.steps = self
            .registry
            .iter()
            .map(|step| StepRecord {
                step: step.kind,
                ordinal: step.ordinal,
                state: if active_steps.contains(step.kind) {
                    StepState::Pending
                } else {
                    StepState::Skipped
                },
            })
            .collect();
        transition(summary, RunPhase::StepsResolved);
        self.emit_event(ExecutionEvent::StepsResolved {
            steps: active_steps.iter().collect(),
        });

        let workspace = match &self.options.workspace_root {
            Some(root) => WorkspaceManager::with_root(root),
            None => WorkspaceManager::new(),
        }
        .acquire()?;
        self.emit_event(ExecutionEvent::WorkspaceAcquired {
            path: workspace.path().to_path_buf(),
        });

        Ok(RunContext {
            run_id,
            environment,
            active_steps,
            workspace,
        })
    }

    async fn run_steps(
        &self,
        ctx: &RunContext,
        config: &ConfigTree,
        summary: &mut RunSummary,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let main = config.main_settings()?;
        let invoker = StepInvoker::new(
            &self.manager,
            EntryPointResolver {
                project_root: self.options.project_root.clone(),
                components_repository: main.components_repository,
            },
        );

        for step in self.registry.iter() {
            if !ctx.active_steps.contains(step.kind) {
                debug!("Skipping step {}", step.id());
                self.emit_event(ExecutionEvent::StepSkipped { step: step.kind });
                continue;
            }

            transition(summary, RunPhase::Running { ordinal: step.ordinal });

            // Binding errors and a pending cancellation abort before the
            // step's process is started
            let bound = if cancel.is_cancelled() {
                Err(PipelineError::Interrupted {
                    step_id: step.id().to_string(),
                })
            } else {
                ParameterBinder::bind_for_invocation(step, config, &ctx.workspace)
            };
            let result = match bound {
                Ok(params) => {
                    set_step_state(summary, step.kind, StepState::Running { started_at: Utc::now() });
                    self.emit_event(ExecutionEvent::StepStarted {
                        step: step.kind,
                        ordinal: step.ordinal,
                    });
                    invoker
                        .invoke(
                            step,
                            params,
                            &ctx.workspace,
                            self.options.env_manager,
                            &ctx.environment,
                            cancel,
                        )
                        .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    let started_at = match summary.record(step.kind).map(|r| &r.state) {
                        Some(StepState::Running { started_at }) => *started_at,
                        _ => Utc::now(),
                    };
                    set_step_state(
                        summary,
                        step.kind,
                        StepState::Completed {
                            started_at,
                            completed_at: Utc::now(),
                        },
                    );
                    self.emit_event(ExecutionEvent::StepCompleted { step: step.kind });
                }
                Err(e) => {
                    set_step_state(
                        summary,
                        step.kind,
                        StepState::Failed {
                            error: e.to_string(),
                            failed_at: Utc::now(),
                        },
                    );
                    self.emit_event(ExecutionEvent::StepFailed {
                        step: step.kind,
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            }
        }

        Ok(())
    }
}

fn transition(summary: &mut RunSummary, next: RunPhase) {
    debug_assert!(
        summary.phase.can_transition_to(next),
        "illegal run transition {:?} -> {:?}",
        summary.phase,
        next
    );
    debug!("Run phase {:?} -> {:?}", summary.phase, next);
    summary.phase = next;
}

fn set_step_state(summary: &mut RunSummary, step: StepKind, state: StepState) {
    if let Some(record) = summary.record_mut(step) {
        record.state = state;
    }
}

/// Resolves when the process receives Ctrl-C or (on unix) SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
