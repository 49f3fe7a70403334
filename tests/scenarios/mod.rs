//! Scenario-based tests for ml-pipeline

mod interrupt;
mod selection;
mod workspace;
