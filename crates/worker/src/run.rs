//! One batch run from a loaded [`BatchConfig`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use simbatch_core::batch::BatchExecutor;
use simbatch_core::instantiate::CaseInstantiator;
use simbatch_core::params::ParameterTable;
use simbatch_core::scripting::executor::JobLauncher;
use simbatch_core::scripting::subprocess::ProcessLauncher;
use simbatch_core::template::TemplateSet;
use simbatch_pipeline::{ExecutionOutcome, RunOrchestrator, RunReport};

use crate::case_plan::load_case_plan;
use crate::config::BatchConfig;

/// JSON report written to the output directory after every run.
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// Run the batch with real simulation processes.
pub async fn run(config: &BatchConfig) -> Result<RunReport> {
    run_with_launcher(config, ProcessLauncher).await
}

/// Run the batch, launching jobs through `launcher`.
///
/// Fails on precondition errors: unreadable case plan, missing columns,
/// missing required templates, or an unusable output directory.
pub async fn run_with_launcher<L: JobLauncher + 'static>(
    config: &BatchConfig,
    launcher: L,
) -> Result<RunReport> {
    log_config(config);

    let case_plan = config.case_plan_path();
    let columns = load_case_plan(&case_plan)?;
    let (params, warnings) = ParameterTable::from_columns(
        &config.settings.macro_params,
        &config.param_mapping,
        &columns,
    )
    .with_context(|| format!("Case plan {} does not match the configuration", case_plan.display()))?;
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    for placeholder in &config.settings.macro_params {
        if let Some(column) = config.param_mapping.get(placeholder) {
            tracing::info!(placeholder = %placeholder, column = %column, "Mapped placeholder");
        }
    }
    tracing::info!(cases = params.case_count(), "Case plan loaded");

    let templates = TemplateSet::discover(config.template_dir()).with_context(|| {
        format!("Failed to discover templates in {}", config.template_dir().display())
    })?;
    for aux in &templates.auxiliary {
        tracing::info!(path = %aux.source_path.display(), "Found auxiliary template");
    }

    let output_dir = CaseInstantiator::new(config.output_dir())
        .prepare_output_dir()
        .context("Failed to create output directory")?;
    tracing::info!(path = %output_dir.display(), "Output directory ready");

    let executor = BatchExecutor::new(launcher, config.sim_command(), config.settings.max_threads);
    let orchestrator = RunOrchestrator::new(config.run_settings(), executor);
    let report = orchestrator
        .run(&params, &templates, &config.replacement_rules())
        .await
        .context("Batch run failed")?;

    let summary_path = write_summary(&output_dir, &report)?;
    tracing::info!(path = %summary_path.display(), "Run summary written");

    if let ExecutionOutcome::Completed(summary) = &report.execution {
        tracing::info!(
            "Simulation results: {}/{} cases succeeded",
            summary.success_count,
            summary.total_count,
        );
    }

    Ok(report)
}

fn log_config(config: &BatchConfig) {
    let settings = &config.settings;
    tracing::info!(
        macro_params = ?settings.macro_params,
        output_dir = %config.output_dir().display(),
        max_threads = settings.max_threads,
        sim_parallel_number = settings.sim_parallel_number,
        "Loaded settings",
    );
    tracing::info!(param_mapping = ?config.param_mapping, "Loaded parameter mapping");
    tracing::info!(replace_rules = ?config.replace_rules, "Loaded replace rules");
    tracing::info!(batch_state = ?config.batch_state, "Loaded batch state");
}

fn write_summary(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    let path = output_dir.join(RUN_SUMMARY_FILE);
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run summary")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write run summary: {}", path.display()))?;
    Ok(path)
}
