//! Environment managers: how a step's unit of work is actually run

pub mod exit;
pub mod mlflow;
pub mod process;

use crate::core::step::ParamValue;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use tokio::process::Command;
use tracing::debug;

pub use exit::{ExitInfo, RunnerError};
pub use mlflow::MlflowRunner;
pub use process::ProcessRunner;

/// Parameters handed to a step, keyed by parameter name
pub type BoundParameters = BTreeMap<String, ParamValue>;

/// Interface every step exposes
pub const DEFAULT_INTERFACE: &str = "main";

/// Kind of isolated environment a step runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvManagerKind {
    #[default]
    Conda,
    Virtualenv,
    /// The caller's own environment
    Local,
}

impl EnvManagerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvManagerKind::Conda => "conda",
            EnvManagerKind::Virtualenv => "virtualenv",
            EnvManagerKind::Local => "local",
        }
    }
}

impl fmt::Display for EnvManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvManagerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conda" => Ok(EnvManagerKind::Conda),
            "virtualenv" => Ok(EnvManagerKind::Virtualenv),
            "local" => Ok(EnvManagerKind::Local),
            other => Err(format!("unknown environment manager: {}", other)),
        }
    }
}

/// Everything needed to start one step's unit of work
#[derive(Debug, Clone)]
pub struct Invocation {
    pub step_id: String,
    /// Resolved locator: a project directory or a remote component URI
    pub entry_point: String,
    pub interface: String,
    pub version: Option<String>,
    pub env_manager: EnvManagerKind,
    pub parameters: BoundParameters,
    /// Directory the process runs in (the run workspace)
    pub working_dir: PathBuf,
    /// Extra environment variables for the child process
    pub env: Vec<(String, String)>,
}

/// Capability to run a step in an isolated environment
///
/// Implementations block (asynchronously) until the process terminates and
/// report how it ended. Swapping implementations never touches the
/// orchestrator.
#[async_trait]
pub trait EnvironmentManager: Send + Sync {
    /// Run the invocation to completion
    async fn run(&self, invocation: &Invocation) -> Result<ExitInfo, RunnerError>;
}

#[async_trait]
impl<T: EnvironmentManager + ?Sized> EnvironmentManager for &T {
    async fn run(&self, invocation: &Invocation) -> Result<ExitInfo, RunnerError> {
        (**self).run(invocation).await
    }
}

#[async_trait]
impl<T: EnvironmentManager + ?Sized> EnvironmentManager for std::sync::Arc<T> {
    async fn run(&self, invocation: &Invocation) -> Result<ExitInfo, RunnerError> {
        (**self).run(invocation).await
    }
}

#[async_trait]
impl<T: EnvironmentManager + ?Sized> EnvironmentManager for Box<T> {
    async fn run(&self, invocation: &Invocation) -> Result<ExitInfo, RunnerError> {
        (**self).run(invocation).await
    }
}

/// Spawn a prepared command and wait for it.
///
/// Output is inherited so step logs reach the terminal as they happen. On
/// unix the step gets its own process group. If the returned future is
/// dropped before the step exits, the whole group is killed, which is how an
/// interrupted run takes the step and everything it started down with it.
pub(crate) async fn wait_for(
    mut command: Command,
    program: &str,
    invocation: &Invocation,
) -> Result<ExitInfo, RunnerError> {
    command
        .current_dir(&invocation.working_dir)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .kill_on_drop(true);

    #[cfg(unix)]
    command.process_group(0);

    debug!("Spawning {} for step {}", program, invocation.step_id);

    let mut child = command.spawn().map_err(|e| RunnerError::Spawn {
        program: program.to_string(),
        reason: e.to_string(),
    })?;
    let group = ProcessGroupGuard::new(child.id());

    let status = child.wait().await.map_err(|e| RunnerError::Wait {
        program: program.to_string(),
        reason: e.to_string(),
    })?;
    group.disarm();

    Ok(ExitInfo::from(status))
}

/// Kills a step's process group on drop unless the step finished first
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        Ok(()) => debug!("Killed process group {}", pgid),
        Err(e) => debug!("Process group {} not signalled: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}
