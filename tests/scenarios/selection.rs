//! Test: Step selection - which steps run, and in what order

use crate::helpers::*;
use ml_pipeline::core::{ExecutionStatus, RunPhase, StepKind, StepState};
use ml_pipeline::{PipelineError, StepRegistry, StepSelector};
use std::sync::Arc;

/// A single named step runs alone
#[tokio::test]
async fn test_single_step_directive() {
    let config = config_with_steps("basic_cleaning");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_completed(&result);
    assert_invocation_order(&manager, &["basic_cleaning"]);
    assert_eq!(result.summary().status, ExecutionStatus::Completed);
    assert_eq!(result.summary().phase, RunPhase::Completed);
    assert_eq!(
        result.get_step_state(StepKind::Download),
        Some(&StepState::Skipped)
    );
}

/// Steps run in catalog order, not the order they were listed
#[tokio::test]
async fn test_registry_order_wins() {
    let config = config_with_steps("data_check,download");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_completed(&result);
    assert_invocation_order(&manager, &["download", "data_check"]);
    assert_eq!(
        result.summary().invoked_steps(),
        vec![StepKind::Download, StepKind::DataCheck]
    );
}

/// "all" leaves out the step that is not default-active
#[tokio::test]
async fn test_all_excludes_optional_step() {
    let config = config_with_steps("all");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_completed(&result);
    assert_invocation_order(
        &manager,
        &[
            "download",
            "basic_cleaning",
            "data_check",
            "data_split",
            "train_random_forest",
        ],
    );
    assert_eq!(
        result.get_step_state(StepKind::TestRegressionModel),
        Some(&StepState::Skipped)
    );
    assert_eq!(result.summary().completed_steps(), 5);
}

/// The optional step still runs when named explicitly
#[tokio::test]
async fn test_optional_step_by_name() {
    let config = config_with_steps("test_regression_model");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_completed(&result);
    assert_invocation_order(&manager, &["test_regression_model"]);
}

/// A missing main.steps means "all"
#[tokio::test]
async fn test_missing_directive_defaults_to_all() {
    let config = config_from_yaml(&FULL_CONFIG.replace("  steps: all\n", ""));
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_completed(&result);
    assert_eq!(manager.invoked_steps().len(), 5);
}

/// An unknown token aborts before anything is started
#[tokio::test]
async fn test_unknown_step_invokes_nothing() {
    let config = config_with_steps("download,train");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_failed(&result);
    assert!(manager.invoked_steps().is_empty());
    assert!(result.workspace_path().is_none());
    assert_eq!(result.summary().phase, RunPhase::Aborted);
    assert!(matches!(
        result.outcome.error,
        Some(PipelineError::UnknownStep(ref token)) if token == "train"
    ));
}

/// Selecting nothing is a successful run with no invocations
#[tokio::test]
async fn test_no_default_steps_runs_nothing() {
    let optional_only: Vec<_> = StepRegistry::standard()
        .iter()
        .filter(|s| !s.is_default_active)
        .cloned()
        .collect();
    let config = config_with_steps("all");
    let manager = Arc::new(MockManager::new());

    let result =
        run_with_registry(&config, manager.clone(), StepRegistry::from_steps(optional_only)).await;

    assert_run_completed(&result);
    assert!(manager.invoked_steps().is_empty());
    assert_eq!(result.summary().selected_steps(), 0);
    assert_workspace_removed(&result);
}

/// A trailing comma leaves an empty token, which names no step
#[tokio::test]
async fn test_trailing_comma_is_unknown_step() {
    let config = config_with_steps("download,");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_failed(&result);
    assert!(manager.invoked_steps().is_empty());
    assert!(matches!(
        result.outcome.error,
        Some(PipelineError::UnknownStep(ref token)) if token.is_empty()
    ));
}

/// Resolution ignores duplicates and listing order
#[test]
fn test_selection_is_idempotent() {
    let registry = StepRegistry::standard();

    let once = StepSelector::resolve("data_split,download", &registry).unwrap();
    let again = StepSelector::resolve("download,data_split,download", &registry).unwrap();
    let reordered = StepSelector::resolve("data_split,download,data_split", &registry).unwrap();

    assert_eq!(once, again);
    assert_eq!(once, reordered);
    assert_eq!(once.ids(), vec!["download", "data_split"]);
}
