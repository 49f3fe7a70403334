//! Pipeline configuration tree
//!
//! The orchestrator consumes configuration as an already-materialized nested
//! key/value tree. Values are addressed with dotted paths such as
//! `modeling.random_forest.max_depth`.

use crate::core::error::PipelineError;
use regex::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use std::sync::OnceLock;

/// Directive selecting every default-active step
pub const ALL_STEPS: &str = "all";

/// Nested configuration values
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

/// Typed view of the `main` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainSettings {
    pub project_name: String,
    pub experiment_name: String,
    /// `"all"` or a comma-separated list of step ids
    pub steps: String,
    /// Base locator for externally hosted steps
    pub components_repository: Option<String>,
}

impl ConfigTree {
    /// Load a configuration tree from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Parse a configuration tree from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, PipelineError> {
        let root: Value =
            serde_yaml::from_str(yaml).map_err(|e| PipelineError::ConfigLoad(e.to_string()))?;
        Self::from_value(root)
    }

    /// Wrap an existing value; the root must be a mapping (or empty)
    pub fn from_value(root: Value) -> Result<Self, PipelineError> {
        match root {
            Value::Mapping(_) => Ok(Self { root }),
            Value::Null => Ok(Self {
                root: Value::Mapping(Mapping::new()),
            }),
            _ => Err(PipelineError::ConfigLoad(
                "top level of the configuration must be a mapping".to_string(),
            )),
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a dotted path. Sequence elements are addressed by index.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.root, path)
    }

    /// Look up a dotted path, treating an absent or null value as missing
    pub fn require(&self, path: &str) -> Result<&Value, PipelineError> {
        match self.get(path) {
            None | Some(Value::Null) => Err(PipelineError::MissingConfig(path.to_string())),
            Some(value) => Ok(value),
        }
    }

    /// Look up a scalar and render it as a string
    pub fn require_string(&self, path: &str) -> Result<String, PipelineError> {
        let value = self.require(path)?;
        scalar_to_string(value).ok_or_else(|| PipelineError::InvalidConfig {
            path: path.to_string(),
            reason: "expected a scalar value".to_string(),
        })
    }

    /// Set a value at a dotted path, creating intermediate mappings
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), PipelineError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PipelineError::InvalidConfig {
                path: path.to_string(),
                reason: "empty path segment".to_string(),
            });
        }

        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| PipelineError::MissingConfig(path.to_string()))?;

        let mut node = &mut self.root;
        for segment in parents {
            let map = node.as_mapping_mut().ok_or_else(|| PipelineError::InvalidConfig {
                path: path.to_string(),
                reason: format!("'{}' is not a mapping", segment),
            })?;
            let key = Value::String(segment.to_string());
            if !map.contains_key(&key) {
                map.insert(key.clone(), Value::Mapping(Mapping::new()));
            }
            node = map
                .get_mut(&key)
                .ok_or_else(|| PipelineError::MissingConfig(path.to_string()))?;
        }

        let map = node.as_mapping_mut().ok_or_else(|| PipelineError::InvalidConfig {
            path: path.to_string(),
            reason: "parent is not a mapping".to_string(),
        })?;
        map.insert(Value::String(last.to_string()), value);
        Ok(())
    }

    /// Apply a command-line override. The raw value is read as a YAML
    /// scalar so `0.3` stays a number and `download,data_check` a string.
    pub fn apply_override(&mut self, path: &str, raw: &str) -> Result<(), PipelineError> {
        let value = if raw.is_empty() {
            Value::String(String::new())
        } else {
            match serde_yaml::from_str::<Value>(raw) {
                Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => v,
                _ => Value::String(raw.to_string()),
            }
        };
        self.set(path, value)
    }

    /// Replace `${dotted.path}` references with the values they point at.
    ///
    /// A value consisting of a single reference takes the referenced value
    /// as-is (numbers stay numbers, mappings stay mappings); references
    /// embedded in a longer string must point at scalars.
    pub fn resolve_interpolations(&mut self) -> Result<(), PipelineError> {
        let snapshot = self.root.clone();
        let mut visiting = Vec::new();
        self.root = resolve_node(&snapshot, &snapshot, &mut visiting)?;
        Ok(())
    }

    /// Read the `main` section
    pub fn main_settings(&self) -> Result<MainSettings, PipelineError> {
        let steps = match self.get("main.steps") {
            None | Some(Value::Null) => ALL_STEPS.to_string(),
            Some(_) => self.require_string("main.steps")?,
        };

        let components_repository = match self.get("main.components_repository") {
            None | Some(Value::Null) => None,
            Some(_) => Some(self.require_string("main.components_repository")?),
        };

        Ok(MainSettings {
            project_name: self.require_string("main.project_name")?,
            experiment_name: self.require_string("main.experiment_name")?,
            steps,
            components_repository,
        })
    }
}

/// Render a scalar value the way it would appear on a command line
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Mapping(map) => map.get(segment),
        Value::Sequence(seq) => segment.parse::<usize>().ok().and_then(|i| seq.get(i)),
        _ => None,
    })
}

fn interpolation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{\s*([A-Za-z0-9_.\-]+)\s*\}").expect("interpolation pattern is valid")
    })
}

fn resolve_node(
    root: &Value,
    node: &Value,
    visiting: &mut Vec<String>,
) -> Result<Value, PipelineError> {
    match node {
        Value::String(s) => resolve_string(root, s, visiting),
        Value::Mapping(map) => {
            let mut resolved = Mapping::new();
            for (key, value) in map {
                resolved.insert(key.clone(), resolve_node(root, value, visiting)?);
            }
            Ok(Value::Mapping(resolved))
        }
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| resolve_node(root, v, visiting))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        other => Ok(other.clone()),
    }
}

fn resolve_reference(
    root: &Value,
    path: &str,
    visiting: &mut Vec<String>,
) -> Result<Value, PipelineError> {
    if visiting.iter().any(|p| p == path) {
        return Err(PipelineError::InvalidConfig {
            path: path.to_string(),
            reason: format!("interpolation cycle through {}", visiting.join(" -> ")),
        });
    }

    let target = lookup(root, path).ok_or_else(|| PipelineError::MissingConfig(path.to_string()))?;

    visiting.push(path.to_string());
    let resolved = resolve_node(root, target, visiting);
    visiting.pop();
    resolved
}

fn resolve_string(
    root: &Value,
    s: &str,
    visiting: &mut Vec<String>,
) -> Result<Value, PipelineError> {
    let pattern = interpolation_pattern();

    if let Some(caps) = pattern.captures(s) {
        if caps.get(0).map(|m| m.as_str().len()) == Some(s.len()) {
            return resolve_reference(root, &caps[1], visiting);
        }
    } else {
        return Ok(Value::String(s.to_string()));
    }

    let mut failure = None;
    let replaced = pattern.replace_all(s, |caps: &Captures| {
        if failure.is_some() {
            return String::new();
        }
        let path = &caps[1];
        match resolve_reference(root, path, visiting) {
            Ok(value) => match scalar_to_string(&value) {
                Some(text) => text,
                None => {
                    failure = Some(PipelineError::InvalidConfig {
                        path: path.to_string(),
                        reason: "only scalar values can be embedded in a string".to_string(),
                    });
                    String::new()
                }
            },
            Err(e) => {
                failure = Some(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(Value::String(replaced.into_owned())),
    }
}
