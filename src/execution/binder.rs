//! Parameter binding - builds a step's parameter map from configuration

use crate::core::{ConfigTree, ParamSource, ParamValue, PipelineError, PreInvocationHook, Step};
use crate::execution::workspace::Workspace;
use crate::runner::BoundParameters;
use serde_yaml::Value;
use tracing::debug;

/// Binds step parameters
pub struct ParameterBinder;

impl ParameterBinder {
    /// Resolve every declared parameter of `step`.
    ///
    /// Artifact references are formatted as `name:tag` only; resolving them
    /// is left to the step itself.
    pub fn bind(step: &Step, config: &ConfigTree) -> Result<BoundParameters, PipelineError> {
        let mut params = BoundParameters::new();

        for (name, source) in &step.parameter_spec {
            let value = match source {
                ParamSource::Literal(value) => value.clone(),
                ParamSource::ConfigPath(path) => config_value(path, config.require(path)?)?,
                ParamSource::ArtifactRef(reference) => ParamValue::String(reference.to_string()),
            };
            params.insert(name.clone(), value);
        }

        Ok(params)
    }

    /// Run the step's pre-invocation hooks against the workspace, adding the
    /// parameters they produce
    pub fn apply_hooks(
        step: &Step,
        config: &ConfigTree,
        workspace: &Workspace,
        params: &mut BoundParameters,
    ) -> Result<(), PipelineError> {
        for hook in &step.hooks {
            match hook {
                PreInvocationHook::WriteConfigJson {
                    config_path,
                    file_name,
                    param,
                } => {
                    let subtree = config.require(config_path)?;
                    let json = serde_json::to_string_pretty(subtree).map_err(|e| {
                        PipelineError::InvalidConfig {
                            path: config_path.clone(),
                            reason: format!("cannot be written as JSON: {}", e),
                        }
                    })?;

                    let target = workspace.file(file_name);
                    std::fs::write(&target, json).map_err(|e| {
                        PipelineError::Workspace(format!(
                            "failed to write {}: {}",
                            target.display(),
                            e
                        ))
                    })?;

                    debug!("Wrote {} for step {}", target.display(), step.id());
                    params.insert(param.clone(), ParamValue::String(target.display().to_string()));
                }
            }
        }

        Ok(())
    }

    /// Bind parameters and apply hooks, ready for invocation
    pub fn bind_for_invocation(
        step: &Step,
        config: &ConfigTree,
        workspace: &Workspace,
    ) -> Result<BoundParameters, PipelineError> {
        let mut params = Self::bind(step, config)?;
        Self::apply_hooks(step, config, workspace, &mut params)?;
        Ok(params)
    }
}

fn config_value(path: &str, value: &Value) -> Result<ParamValue, PipelineError> {
    match value {
        Value::Bool(b) => Ok(ParamValue::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(ParamValue::Integer(i)),
            None => n.as_f64().map(ParamValue::Float).ok_or_else(|| PipelineError::InvalidConfig {
                path: path.to_string(),
                reason: format!("unrepresentable number {}", n),
            }),
        },
        Value::String(s) => Ok(ParamValue::String(s.clone())),
        Value::Null => Err(PipelineError::MissingConfig(path.to_string())),
        _ => Err(PipelineError::InvalidConfig {
            path: path.to_string(),
            reason: "expected a scalar parameter value".to_string(),
        }),
    }
}
