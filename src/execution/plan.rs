//! Dry-run planning: what a run would do, without doing it

use crate::core::{ConfigTree, PipelineError, StepKind, StepRegistry};
use crate::execution::binder::ParameterBinder;
use crate::execution::invoker::EntryPointResolver;
use crate::execution::selector::StepSelector;
use crate::runner::BoundParameters;
use serde::Serialize;
use std::path::Path;

/// One selected step as it would be invoked
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub step: StepKind,
    pub ordinal: u32,
    pub entry_point: String,
    pub version: Option<String>,
    pub parameters: BoundParameters,
    /// Workspace side effects that would run first
    pub hooks: Vec<String>,
    pub note: Option<String>,
}

/// Resolve and bind every selected step, in execution order.
///
/// Fails with the same error a real run would hit first, except that hook
/// side effects are described instead of performed.
pub fn plan_run(
    registry: &StepRegistry,
    config: &ConfigTree,
    project_root: &Path,
) -> Result<Vec<PlannedStep>, PipelineError> {
    let main = config.main_settings()?;
    let active = StepSelector::resolve(&main.steps, registry)?;
    let resolver = EntryPointResolver {
        project_root: project_root.to_path_buf(),
        components_repository: main.components_repository,
    };

    registry
        .iter()
        .filter(|step| active.contains(step.kind))
        .map(|step| {
            Ok(PlannedStep {
                step: step.kind,
                ordinal: step.ordinal,
                entry_point: resolver.resolve(&step.entry_point)?,
                version: step.version.clone(),
                parameters: ParameterBinder::bind(step, config)?,
                hooks: step.hooks.iter().map(|h| h.to_string()).collect(),
                note: step.note.clone(),
            })
        })
        .collect()
}
