//! Step selection - turns a step directive into the active step set

use crate::core::config::ALL_STEPS;
use crate::core::{PipelineError, StepKind, StepRegistry};
use std::collections::BTreeMap;
use tracing::debug;

/// Steps selected for one run, always iterated in ordinal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveStepSet {
    steps: BTreeMap<u32, StepKind>,
}

impl ActiveStepSet {
    pub fn contains(&self, kind: StepKind) -> bool {
        self.steps.values().any(|k| *k == kind)
    }

    /// Selected steps in execution order
    pub fn iter(&self) -> impl Iterator<Item = StepKind> + '_ {
        self.steps.values().copied()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.iter().map(|k| k.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn insert(&mut self, ordinal: u32, kind: StepKind) {
        self.steps.insert(ordinal, kind);
    }
}

/// Resolves step directives against a registry
pub struct StepSelector;

impl StepSelector {
    /// Resolve `"all"` or a comma-separated list of step ids.
    ///
    /// `"all"` means every default-active step. For a list, every token must
    /// name a registry step; the result follows registry order no matter
    /// how the tokens were ordered, and duplicates collapse.
    pub fn resolve(directive: &str, registry: &StepRegistry) -> Result<ActiveStepSet, PipelineError> {
        let mut active = ActiveStepSet::default();

        if directive.trim() == ALL_STEPS {
            for step in registry.iter().filter(|s| s.is_default_active) {
                active.insert(step.ordinal, step.kind);
            }
            debug!("Directive 'all' selected {:?}", active.ids());
            return Ok(active);
        }

        for token in directive.split(',').map(str::trim) {
            let step = registry
                .find(token)
                .ok_or_else(|| PipelineError::UnknownStep(token.to_string()))?;
            active.insert(step.ordinal, step.kind);
        }

        debug!("Directive '{}' selected {:?}", directive, active.ids());
        Ok(active)
    }
}
