//! Test utility functions for ml-pipeline

use ml_pipeline::core::{RunSummary, StepKind, StepState};
use ml_pipeline::execution::{ExecutionEvent, Orchestrator, OrchestratorOptions, RunOutcome};
use ml_pipeline::runner::{EnvManagerKind, EnvironmentManager, ExitInfo, Invocation, RunnerError};
use ml_pipeline::{ConfigTree, StepRegistry};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Full configuration every standard step can bind against
pub const FULL_CONFIG: &str = r#"
main:
  components_repository: https://github.com/example/ml-components#components
  project_name: nyc_airbnb
  experiment_name: development
  steps: all
etl:
  sample: sample1.csv
  min_price: 10
  max_price: 350
data_check:
  kl_threshold: 0.2
modeling:
  test_size: 0.2
  val_size: 0.2
  random_seed: 42
  stratify_by: neighbourhood_group
  max_tfidf_features: 5
  random_forest:
    n_estimators: 100
    max_depth: 15
    min_samples_split: 4
"#;

/// What the mock saw when a step was invoked
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    pub invocation: Invocation,
    /// Whether the workspace directory existed while the step ran
    pub workspace_existed: bool,
    /// Contents of files the step found in its workspace
    pub workspace_files: HashMap<String, String>,
}

/// Mock environment manager that records invocations and returns
/// predefined exit codes
#[derive(Default)]
pub struct MockManager {
    calls: Mutex<Vec<RecordedInvocation>>,
    exit_codes: HashMap<String, i32>,
    spawn_failures: Vec<String>,
    hangs: Vec<String>,
    cancel_on: Option<(String, CancellationToken)>,
}

impl MockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `step_id` exit with `code`
    pub fn with_exit_code(mut self, step_id: &str, code: i32) -> Self {
        self.exit_codes.insert(step_id.to_string(), code);
        self
    }

    /// Make `step_id` fail to start at all
    pub fn with_spawn_failure(mut self, step_id: &str) -> Self {
        self.spawn_failures.push(step_id.to_string());
        self
    }

    /// Make `step_id` run until it is killed
    pub fn with_hang(mut self, step_id: &str) -> Self {
        self.hangs.push(step_id.to_string());
        self
    }

    /// Cancel `token` as soon as `step_id` is invoked
    pub fn cancel_on(mut self, step_id: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((step_id.to_string(), token));
        self
    }

    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn invoked_steps(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.invocation.step_id.clone())
            .collect()
    }

    pub fn invocation(&self, step_id: &str) -> Option<Invocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.invocation.step_id == step_id)
            .map(|r| r.invocation.clone())
    }
}

#[async_trait]
impl EnvironmentManager for MockManager {
    async fn run(&self, invocation: &Invocation) -> Result<ExitInfo, RunnerError> {
        let mut workspace_files = HashMap::new();
        if let Ok(entries) = std::fs::read_dir(&invocation.working_dir) {
            for entry in entries.flatten() {
                if let Ok(contents) = std::fs::read_to_string(entry.path()) {
                    workspace_files.insert(entry.file_name().to_string_lossy().to_string(), contents);
                }
            }
        }

        self.calls.lock().unwrap().push(RecordedInvocation {
            invocation: invocation.clone(),
            workspace_existed: invocation.working_dir.is_dir(),
            workspace_files,
        });

        if let Some((step_id, token)) = &self.cancel_on {
            if *step_id == invocation.step_id {
                token.cancel();
            }
        }

        if self.hangs.contains(&invocation.step_id) {
            std::future::pending::<()>().await;
        }

        if self.spawn_failures.contains(&invocation.step_id) {
            return Err(RunnerError::Spawn {
                program: "mock".to_string(),
                reason: "not found".to_string(),
            });
        }

        let code = self.exit_codes.get(&invocation.step_id).copied().unwrap_or(0);
        Ok(ExitInfo::Code(code))
    }
}

/// Result of a test run with the events it produced
pub struct PipelineTestResult {
    pub outcome: RunOutcome,
    pub events: Vec<ExecutionEvent>,
}

impl PipelineTestResult {
    pub fn summary(&self) -> &RunSummary {
        &self.outcome.summary
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn get_step_state(&self, step: StepKind) -> Option<&StepState> {
        self.outcome.summary.record(step).map(|r| &r.state)
    }

    /// Workspace path announced by the orchestrator, if one was acquired
    pub fn workspace_path(&self) -> Option<PathBuf> {
        self.events.iter().find_map(|event| match event {
            ExecutionEvent::WorkspaceAcquired { path } => Some(path.clone()),
            _ => None,
        })
    }
}

/// Build a config tree from YAML text
pub fn config_from_yaml(yaml: &str) -> ConfigTree {
    ConfigTree::from_yaml(yaml).expect("Should parse config YAML")
}

/// Full config with `main.steps` set to `directive`
pub fn config_with_steps(directive: &str) -> ConfigTree {
    let mut config = config_from_yaml(FULL_CONFIG);
    config
        .apply_override("main.steps", directive)
        .expect("Should set main.steps");
    config
}

pub fn test_options() -> OrchestratorOptions {
    OrchestratorOptions {
        env_manager: EnvManagerKind::Local,
        project_root: PathBuf::from("/project"),
        workspace_root: None,
    }
}

/// Run the standard catalog against `config` with `manager`
pub async fn run_with_mock(config: &ConfigTree, manager: Arc<MockManager>) -> PipelineTestResult {
    run_with_registry(config, manager, StepRegistry::standard()).await
}

/// Run a custom catalog against `config` with `manager`
pub async fn run_with_registry(
    config: &ConfigTree,
    manager: Arc<MockManager>,
    registry: StepRegistry,
) -> PipelineTestResult {
    let orchestrator = Orchestrator::new(manager, test_options()).with_registry(registry);
    record_run(orchestrator, config, CancellationToken::new()).await
}

/// Run the standard catalog against `config`, stopping once `cancel` fires
pub async fn run_with_cancellation(
    config: &ConfigTree,
    manager: Arc<MockManager>,
    cancel: CancellationToken,
) -> PipelineTestResult {
    record_run(Orchestrator::new(manager, test_options()), config, cancel).await
}

/// Run `orchestrator` and collect every event it emits
pub async fn record_run<M: EnvironmentManager>(
    mut orchestrator: Orchestrator<M>,
    config: &ConfigTree,
    cancel: CancellationToken,
) -> PipelineTestResult {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    orchestrator.add_event_handler(move |event| {
        sink.lock().unwrap().push(event.clone());
    });

    let outcome = orchestrator.run_until_cancelled(config, cancel).await;
    let events = events.lock().unwrap().clone();

    PipelineTestResult { outcome, events }
}

// Assertion helpers

pub fn assert_run_completed(result: &PipelineTestResult) {
    assert!(
        result.is_success(),
        "Run should have completed, got error: {:?}",
        result.outcome.error
    );
}

pub fn assert_run_failed(result: &PipelineTestResult) {
    assert!(!result.is_success(), "Run should have failed");
}

pub fn assert_invocation_order(manager: &MockManager, expected: &[&str]) {
    let actual = manager.invoked_steps();
    assert_eq!(
        actual, expected,
        "Invocation order mismatch.\nExpected: {:?}\nActual: {:?}",
        expected, actual
    );
}

pub fn assert_workspace_removed(result: &PipelineTestResult) {
    let path = result
        .workspace_path()
        .expect("Run should have acquired a workspace");
    assert!(
        !path.exists(),
        "Workspace {} should have been removed",
        path.display()
    );
}
