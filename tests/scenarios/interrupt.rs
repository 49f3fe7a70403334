//! Test: Interrupts - a cancelled run stops, cleans up and exits with 130

use crate::helpers::*;
use ml_pipeline::core::{ExecutionStatus, RunPhase, StepKind, StepState};
use ml_pipeline::execution::ExecutionEvent;
use ml_pipeline::PipelineError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cancelling while a step runs kills it and aborts the run
#[tokio::test]
async fn test_cancel_during_step() {
    let config = config_with_steps("basic_cleaning,data_check,data_split");
    let cancel = CancellationToken::new();
    let manager = Arc::new(
        MockManager::new()
            .with_hang("data_check")
            .cancel_on("data_check", cancel.clone()),
    );

    let result = run_with_cancellation(&config, manager.clone(), cancel).await;

    assert_run_failed(&result);
    assert_invocation_order(&manager, &["basic_cleaning", "data_check"]);
    assert_workspace_removed(&result);

    assert_eq!(result.summary().status, ExecutionStatus::Cancelled);
    assert_eq!(result.summary().phase, RunPhase::Aborted);
    assert!(matches!(
        result.get_step_state(StepKind::DataCheck),
        Some(StepState::Failed { .. })
    ));
    assert_eq!(
        result.get_step_state(StepKind::DataSplit),
        Some(&StepState::Pending)
    );

    match &result.outcome.error {
        Some(error @ PipelineError::Interrupted { step_id }) => {
            assert_eq!(step_id, "data_check");
            assert_eq!(error.exit_code(), 130);
        }
        other => panic!("Expected Interrupted, got {:?}", other),
    }
    assert!(matches!(
        result.events.last(),
        Some(ExecutionEvent::RunFinished {
            status: ExecutionStatus::Cancelled,
            ..
        })
    ));
}

/// Cancelling between steps keeps the next step from starting
#[tokio::test]
async fn test_cancel_between_steps() {
    let config = config_with_steps("download,basic_cleaning,data_check");
    let cancel = CancellationToken::new();
    let manager = Arc::new(MockManager::new().cancel_on("download", cancel.clone()));

    let result = run_with_cancellation(&config, manager.clone(), cancel).await;

    assert_invocation_order(&manager, &["download"]);
    assert_workspace_removed(&result);
    assert_eq!(result.summary().status, ExecutionStatus::Cancelled);
    assert!(matches!(
        result.get_step_state(StepKind::Download),
        Some(StepState::Completed { .. })
    ));
    assert!(matches!(
        &result.outcome.error,
        Some(PipelineError::Interrupted { step_id }) if step_id == "basic_cleaning"
    ));
    assert!(!result
        .events
        .iter()
        .any(|e| matches!(e, ExecutionEvent::StepStarted { step: StepKind::BasicCleaning, .. })));
}

/// A token cancelled up front still releases the workspace it acquired
#[tokio::test]
async fn test_cancel_before_first_step() {
    let config = config_with_steps("download");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let manager = Arc::new(MockManager::new());

    let result = run_with_cancellation(&config, manager.clone(), cancel).await;

    assert!(manager.invoked_steps().is_empty());
    assert_workspace_removed(&result);
    assert_eq!(result.summary().status, ExecutionStatus::Cancelled);
    assert_eq!(result.outcome.error.as_ref().map(|e| e.exit_code()), Some(130));
}

/// Interrupting a real step takes down everything it started
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_cancel_kills_step_descendants() {
    use ml_pipeline::execution::Orchestrator;
    use ml_pipeline::runner::ProcessRunner;
    use ml_pipeline::OrchestratorOptions;
    use std::time::Duration;
    use tempfile::TempDir;

    let project = TempDir::new().unwrap();
    let step_dir = project.path().join("src/basic_cleaning");
    std::fs::create_dir_all(&step_dir).unwrap();
    let pid_file = project.path().join("descendant.pid");
    std::fs::write(
        step_dir.join("main"),
        format!("sleep 300 &\necho $! > '{}'\nwait\n", pid_file.display()),
    )
    .unwrap();

    let config = config_with_steps("basic_cleaning");
    let options = OrchestratorOptions {
        project_root: project.path().to_path_buf(),
        ..test_options()
    };
    let orchestrator = Orchestrator::new(ProcessRunner::with_interpreter("sh"), options);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watched = pid_file.clone();
    let canceller = tokio::spawn(async move {
        for _ in 0..250 {
            if let Some(pid) = read_pid(&watched) {
                trigger.cancel();
                return Some(pid);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        None
    });

    let result = record_run(orchestrator, &config, cancel).await;
    let descendant = canceller
        .await
        .unwrap()
        .expect("step should have started its background process");

    assert_eq!(result.summary().status, ExecutionStatus::Cancelled);
    assert_workspace_removed(&result);

    for _ in 0..100 {
        if !is_running(descendant) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Process {} outlived the interrupted run", descendant);
}

#[cfg(target_os = "linux")]
fn read_pid(path: &std::path::Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Zombies waiting to be reaped count as gone
#[cfg(target_os = "linux")]
fn is_running(pid: i32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z" && state != "X"),
        Err(_) => false,
    }
}
