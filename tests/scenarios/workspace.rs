//! Test: Workspace lifecycle - exists during the run, gone afterwards

use crate::helpers::*;
use ml_pipeline::execution::{Orchestrator, OrchestratorOptions};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_workspace_removed_after_success() {
    let config = config_with_steps("download,basic_cleaning");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_completed(&result);
    assert!(manager.invocations().iter().all(|r| r.workspace_existed));
    assert_workspace_removed(&result);
}

#[tokio::test]
async fn test_workspace_removed_after_failure() {
    let config = config_with_steps("train_random_forest,test_regression_model");
    let manager = Arc::new(MockManager::new().with_exit_code("train_random_forest", 1));

    let result = run_with_mock(&config, manager.clone()).await;

    assert_run_failed(&result);
    assert!(manager.invocations()[0].workspace_existed);
    assert_workspace_removed(&result);
}

/// Every step of a run shares one workspace, used as the working directory
#[tokio::test]
async fn test_steps_share_workspace() {
    let config = config_with_steps("download,data_check");
    let manager = Arc::new(MockManager::new());

    let result = run_with_mock(&config, manager.clone()).await;

    let workspace = result.workspace_path().unwrap();
    let dirs: Vec<_> = manager
        .invocations()
        .into_iter()
        .map(|r| r.invocation.working_dir)
        .collect();
    assert_eq!(dirs, vec![workspace.clone(), workspace]);
}

/// Runs never share a workspace
#[tokio::test]
async fn test_each_run_gets_fresh_workspace() {
    let config = config_with_steps("download");

    let first = run_with_mock(&config, Arc::new(MockManager::new())).await;
    let second = run_with_mock(&config, Arc::new(MockManager::new())).await;

    assert_ne!(first.workspace_path(), second.workspace_path());
    assert_ne!(first.summary().run_id, second.summary().run_id);
}

/// A configured workspace root is where the run directory is created
#[tokio::test]
async fn test_workspace_root_option() {
    let root = TempDir::new().unwrap();
    let config = config_with_steps("basic_cleaning");
    let manager = Arc::new(MockManager::new());

    let options = OrchestratorOptions {
        workspace_root: Some(root.path().to_path_buf()),
        ..test_options()
    };
    let orchestrator = Orchestrator::new(manager.clone(), options);
    let outcome = orchestrator.run(&config).await;

    assert!(outcome.is_success());
    let used = &manager.invocations()[0].invocation.working_dir;
    assert_eq!(used.parent(), Some(root.path()));
    assert!(!used.exists());
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
