//! Run-scoped context: grouping environment and per-run state

use crate::core::config::MainSettings;
use crate::execution::selector::ActiveStepSet;
use crate::execution::workspace::Workspace;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Variable naming the tracking project all step runs report to
pub const PROJECT_VAR: &str = "WANDB_PROJECT";

/// Variable grouping every step run of one experiment together
pub const RUN_GROUP_VAR: &str = "WANDB_RUN_GROUP";

/// Grouping variables handed to every step process of a run
///
/// Built once per run and read-only afterwards. The orchestrator's own
/// process environment is never modified; the invoker passes these to each
/// child explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentScope {
    vars: BTreeMap<String, String>,
}

impl EnvironmentScope {
    pub fn new(project_name: &str, run_group: &str) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(PROJECT_VAR.to_string(), project_name.to_string());
        vars.insert(RUN_GROUP_VAR.to_string(), run_group.to_string());
        Self { vars }
    }

    pub fn from_settings(main: &MainSettings) -> Self {
        Self::new(&main.project_name, &main.experiment_name)
    }

    pub fn project(&self) -> Option<&str> {
        self.get(PROJECT_VAR)
    }

    pub fn run_group(&self) -> Option<&str> {
        self.get(RUN_GROUP_VAR)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything one run owns, from start to end of orchestration
///
/// Never shared between runs. Dropping it removes the workspace.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub environment: EnvironmentScope,
    pub active_steps: ActiveStepSet,
    pub workspace: Workspace,
}
