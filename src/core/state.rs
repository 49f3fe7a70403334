//! Run state models

use crate::core::step::StepKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Phase of one orchestrated run
///
/// `Init -> EnvironmentBound -> StepsResolved -> Running -> Completed | Aborted`.
/// `Aborted` is reachable from every non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Init,
    EnvironmentBound,
    StepsResolved,
    Running { ordinal: u32 },
    Completed,
    Aborted,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Aborted)
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (_, Aborted) => !self.is_terminal(),
            (Init, EnvironmentBound) => true,
            (EnvironmentBound, StepsResolved) => true,
            (StepsResolved, Running { .. }) => true,
            (StepsResolved, Completed) => true,
            (Running { ordinal: a }, Running { ordinal: b }) => b > *a,
            (Running { .. }, Completed) => true,
            _ => false,
        }
    }
}

/// Overall run status reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// State of a single step within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepState {
    /// Selected, not reached yet
    Pending,
    /// Not in the active set
    Skipped,
    Running {
        started_at: DateTime<Utc>,
    },
    Completed {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },
}

impl StepState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Completed { .. } | StepState::Failed { .. } | StepState::Skipped
        )
    }
}

/// Per-step entry of a run summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: StepKind,
    pub ordinal: u32,
    pub state: StepState,
}

/// Outcome of one run, serializable for `--json` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub status: ExecutionStatus,
    pub phase: RunPhase,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
    pub error: Option<String>,
}

impl RunSummary {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            status: ExecutionStatus::Pending,
            phase: RunPhase::Init,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn record(&self, step: StepKind) -> Option<&StepRecord> {
        self.steps.iter().find(|r| r.step == step)
    }

    pub(crate) fn record_mut(&mut self, step: StepKind) -> Option<&mut StepRecord> {
        self.steps.iter_mut().find(|r| r.step == step)
    }

    /// Steps that actually started, in the order they ran
    pub fn invoked_steps(&self) -> Vec<StepKind> {
        self.steps
            .iter()
            .filter(|r| {
                matches!(
                    r.state,
                    StepState::Running { .. } | StepState::Completed { .. } | StepState::Failed { .. }
                )
            })
            .map(|r| r.step)
            .collect()
    }

    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|r| matches!(r.state, StepState::Completed { .. }))
            .count()
    }

    pub fn selected_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|r| r.state != StepState::Skipped)
            .count()
    }
}
