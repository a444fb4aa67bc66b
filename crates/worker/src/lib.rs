//! `simbatch` worker: configuration, case plan loading, logging and the
//! top-level batch run.

pub mod case_plan;
pub mod config;
pub mod logging;
pub mod run;
