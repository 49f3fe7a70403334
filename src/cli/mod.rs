//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{PlanCommand, RunCommand, StepsCommand};
use std::ffi::OsString;

/// ML pipeline orchestrator
#[derive(Debug, Parser, Clone)]
#[command(name = "ml-pipeline")]
#[command(version = "0.1.0")]
#[command(about = "Runs the ML pipeline steps selected in the configuration", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the selected pipeline steps
    Run(RunCommand),

    /// Show the ordered steps and parameters a run would use
    Plan(PlanCommand),

    /// List the step catalog
    Steps(StepsCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
