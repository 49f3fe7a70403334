//! Step domain model

use crate::core::artifact::ArtifactReference;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every step the orchestrator knows about
///
/// The set is closed: adding a step means adding a variant here and an
/// entry in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Download,
    BasicCleaning,
    DataCheck,
    DataSplit,
    TrainRandomForest,
    TestRegressionModel,
}

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::Download,
        StepKind::BasicCleaning,
        StepKind::DataCheck,
        StepKind::DataSplit,
        StepKind::TrainRandomForest,
        StepKind::TestRegressionModel,
    ];

    /// Identifier used in step directives
    pub fn id(&self) -> &'static str {
        match self {
            StepKind::Download => "download",
            StepKind::BasicCleaning => "basic_cleaning",
            StepKind::DataCheck => "data_check",
            StepKind::DataSplit => "data_split",
            StepKind::TrainRandomForest => "train_random_forest",
            StepKind::TestRegressionModel => "test_regression_model",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Where a step's code lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryPoint {
    /// Hosted in the shared components repository, addressed as
    /// `{components_repository}/{name}`
    Component { name: String },
    /// A directory inside this project, relative to the project root
    Local { path: String },
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::Component { name } => write!(f, "component:{}", name),
            EntryPoint::Local { path } => write!(f, "local:{}", path),
        }
    }
}

/// A bound parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Integer(i) => write!(f, "{}", i),
            // Debug keeps the fractional part, so 1.0 stays a float downstream
            ParamValue::Float(x) => write!(f, "{:?}", x),
            ParamValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

/// How a parameter gets its value at bind time
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSource {
    /// Fixed value
    Literal(ParamValue),
    /// Dotted path into the configuration tree
    ConfigPath(String),
    /// Artifact passed to the step as `name:tag`
    ArtifactRef(ArtifactReference),
}

impl ParamSource {
    pub fn literal(value: impl Into<ParamValue>) -> Self {
        ParamSource::Literal(value.into())
    }

    pub fn config(path: &str) -> Self {
        ParamSource::ConfigPath(path.to_string())
    }

    pub fn artifact(name: &str, tag: &str) -> Self {
        ParamSource::ArtifactRef(ArtifactReference::new(name, tag.into()))
    }
}

/// Work done on the run workspace right before a step is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreInvocationHook {
    /// Serialize a configuration subtree to a JSON file in the workspace and
    /// pass the file's absolute path as `param`
    WriteConfigJson {
        config_path: String,
        file_name: String,
        param: String,
    },
}

impl fmt::Display for PreInvocationHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreInvocationHook::WriteConfigJson {
                config_path,
                file_name,
                param,
            } => write!(
                f,
                "write {} to <workspace>/{} as '{}'",
                config_path, file_name, param
            ),
        }
    }
}

/// A single step in the catalog
#[derive(Debug, Clone)]
pub struct Step {
    pub kind: StepKind,

    /// Execution position; lower runs first
    pub ordinal: u32,

    pub entry_point: EntryPoint,

    /// Version of the entry point to check out, if pinned
    pub version: Option<String>,

    /// Parameter name and where its value comes from, in declaration order
    pub parameter_spec: Vec<(String, ParamSource)>,

    /// Whether `"all"` includes this step
    pub is_default_active: bool,

    pub hooks: Vec<PreInvocationHook>,

    /// Human-facing note, e.g. a precondition the operator must satisfy
    pub note: Option<String>,
}

impl Step {
    pub fn id(&self) -> &'static str {
        self.kind.id()
    }

    /// Name of the artifact this step is expected to register, when declared
    pub fn output_artifact(&self) -> Option<&ParamValue> {
        self.parameter_spec.iter().find_map(|(name, source)| match source {
            ParamSource::Literal(value)
                if name == "output_artifact" || name == "artifact_name" =>
            {
                Some(value)
            }
            _ => None,
        })
    }
}
