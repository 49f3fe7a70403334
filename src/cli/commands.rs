//! CLI command definitions

use crate::core::{ConfigTree, PipelineError};
use crate::runner::EnvManagerKind;
use clap::Args;
use std::path::{Path, PathBuf};

/// Where the configuration comes from and how it is overridden
#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Path to the pipeline configuration YAML
    #[arg(short, long, default_value = "config.yaml")]
    pub config: PathBuf,

    /// Configuration overrides (dotted.key=value)
    #[arg(long = "set", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,

    /// Steps to run: "all" or a comma-separated list (overrides main.steps)
    #[arg(long)]
    pub steps: Option<String>,

    /// Base directory for local steps (defaults to the config file's directory)
    #[arg(long)]
    pub project_root: Option<PathBuf>,
}

impl ConfigArgs {
    /// Load the configuration tree with overrides and interpolation applied
    pub fn load(&self) -> Result<ConfigTree, PipelineError> {
        let mut config = ConfigTree::from_file(&self.config)?;
        for (key, value) in &self.overrides {
            config.apply_override(key, value)?;
        }
        if let Some(steps) = &self.steps {
            config.apply_override("main.steps", steps)?;
        }
        config.resolve_interpolations()?;
        Ok(config)
    }

    pub fn project_root(&self) -> PathBuf {
        if let Some(root) = &self.project_root {
            return root.clone();
        }
        match self.config.parent() {
            Some(parent) if parent != Path::new("") => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Run the pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Environment each step runs in
    #[arg(long, value_enum, default_value_t = EnvManagerArg::Conda)]
    pub env_manager: EnvManagerArg,

    /// How steps are launched
    #[arg(long, value_enum, default_value_t = RunnerArg::Mlflow)]
    pub runner: RunnerArg,

    /// Path to the mlflow executable
    #[arg(long, default_value = "mlflow")]
    pub mlflow: String,

    /// Interpreter for the process runner, e.g. "python"
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Directory to create the run workspace in
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show what a run would do without running anything
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List the step catalog
#[derive(Debug, Args, Clone)]
pub struct StepsCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Environment manager argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EnvManagerArg {
    Conda,
    Virtualenv,
    Local,
}

impl From<EnvManagerArg> for EnvManagerKind {
    fn from(arg: EnvManagerArg) -> Self {
        match arg {
            EnvManagerArg::Conda => EnvManagerKind::Conda,
            EnvManagerArg::Virtualenv => EnvManagerKind::Virtualenv,
            EnvManagerArg::Local => EnvManagerKind::Local,
        }
    }
}

/// Step launcher argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunnerArg {
    /// `mlflow run` each step as an MLflow project
    Mlflow,
    /// Execute each local step's program directly
    Process,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
