//! Run workspace - a scoped temporary directory

use crate::core::PipelineError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const WORKSPACE_PREFIX: &str = "ml-pipeline-";

/// Creates run workspaces
#[derive(Debug, Clone, Default)]
pub struct WorkspaceManager {
    /// Parent directory for workspaces; the system temp dir when unset
    root: Option<PathBuf>,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Create a fresh workspace directory
    pub fn acquire(&self) -> Result<Workspace, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);

        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| PipelineError::Workspace(format!("failed to create workspace: {}", e)))?;

        debug!("Acquired workspace {}", dir.path().display());
        Ok(Workspace { dir: Some(dir) })
    }
}

/// A run's private directory, removed when released or dropped
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.as_ref().map(TempDir::path).unwrap_or_else(|| Path::new(""))
    }

    /// Path for a file inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Remove the directory.
    ///
    /// Failures are logged and swallowed so they never mask the error that
    /// ended the run.
    pub fn release(mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => debug!("Removed workspace {}", path.display()),
                Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
            }
        }
    }
}
