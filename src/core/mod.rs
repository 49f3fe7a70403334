//! Core domain models for the pipeline
//!
//! This module defines the step catalog, the configuration tree steps bind
//! their parameters from, and the state a run moves through.

pub mod artifact;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod state;
pub mod step;

pub use artifact::{ArtifactReference, VersionTag};
pub use config::{ConfigTree, MainSettings};
pub use context::{EnvironmentScope, RunContext};
pub use error::PipelineError;
pub use registry::StepRegistry;
pub use state::*;
pub use step::*;
