//! Run sequencing: required templates, batch execution, auxiliary templates.

pub mod orchestrator;

pub use orchestrator::{ExecutionOutcome, RunFlags, RunOrchestrator, RunReport, RunSettings};
