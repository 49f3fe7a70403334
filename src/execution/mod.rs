//! Pipeline execution: selection, binding, invocation and orchestration

pub mod binder;
pub mod engine;
pub mod invoker;
pub mod plan;
pub mod selector;
pub mod workspace;

pub use binder::ParameterBinder;
pub use engine::{EventHandler, ExecutionEvent, Orchestrator, OrchestratorOptions, RunOutcome};
pub use invoker::{EntryPointResolver, StepInvoker};
pub use plan::{plan_run, PlannedStep};
pub use selector::{ActiveStepSet, StepSelector};
pub use workspace::{Workspace, WorkspaceManager};
