//! ml-pipeline - runs an ordered catalog of ML steps, each in its own environment

pub mod cli;
pub mod core;
pub mod execution;
pub mod runner;

// Re-export commonly used types
pub use crate::core::{ConfigTree, PipelineError, Step, StepKind, StepRegistry, RunSummary, ExecutionStatus};
pub use crate::execution::{Orchestrator, OrchestratorOptions, ExecutionEvent, RunOutcome, StepSelector, ParameterBinder};
pub use crate::runner::{EnvironmentManager, EnvManagerKind, ExitInfo, Invocation, MlflowRunner, ProcessRunner};
