//! Central run orchestrator.
//!
//! Sequences one batch run:
//! 1. Instantiate the required case and macro templates.
//! 2. Run the simulation tool over the generated pairs.
//! 3. Instantiate auxiliary templates.
//!
//! Each phase is gated by a [`RunFlags`] switch. Core components return
//! reports; this is the only place that forwards them to `tracing`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use simbatch_core::batch::{BatchExecutor, JobEvent, RunSummary};
use simbatch_core::error::CoreError;
use simbatch_core::instantiate::{CaseInstantiator, InstantiationReport};
use simbatch_core::params::ParameterTable;
use simbatch_core::rules::ReplacementRuleSet;
use simbatch_core::scripting::executor::JobLauncher;
use simbatch_core::template::{TemplateRole, TemplateSet};
use tokio::sync::mpsc;

/// Which phases of a run are enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFlags {
    pub process_required_templates: bool,
    pub process_sim_command: bool,
    pub process_custom_templates: bool,
}

/// Settings that stay fixed for a run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub flags: RunFlags,
}

/// What happened to the execution phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionOutcome {
    /// Disabled, or no required templates were instantiated.
    Skipped,
    Completed(RunSummary),
    /// The phase could not start; auxiliary processing still ran.
    Aborted { reason: String },
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub required: Option<InstantiationReport>,
    pub execution: ExecutionOutcome,
    pub auxiliary: Option<InstantiationReport>,
}

/// Drives the three phases of a batch run.
pub struct RunOrchestrator<L> {
    settings: RunSettings,
    executor: BatchExecutor<L>,
}

impl<L: JobLauncher + 'static> RunOrchestrator<L> {
    pub fn new(settings: RunSettings, executor: BatchExecutor<L>) -> Self {
        Self { settings, executor }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run every enabled phase.
    ///
    /// Returns an error only for preconditions: an invalid parameter table,
    /// an unreadable template, or an output directory that cannot be
    /// created. Per-case failures are reported in the [`RunReport`].
    pub async fn run(
        &self,
        params: &ParameterTable,
        templates: &TemplateSet,
        rules: &ReplacementRuleSet,
    ) -> Result<RunReport, CoreError> {
        let flags = self.settings.flags;
        let instantiator = CaseInstantiator::new(&self.settings.output_dir);

        // 1. Required templates.
        let required = if flags.process_required_templates {
            tracing::info!("=== Processing required templates ===");
            let report = instantiator.instantiate(&templates.required(), params, rules)?;
            log_instantiation(&report, "required");
            Some(report)
        } else {
            tracing::info!("=== Skipping required templates ===");
            None
        };

        // 2. Batch execution over whatever pairs step 1 produced.
        let execution = match (&required, flags.process_sim_command) {
            (Some(report), true) => {
                tracing::info!("=== Running simulation batch ===");
                let outcome = self.execute(report).await;
                tracing::info!("=== Simulation batch finished ===");
                outcome
            }
            (None, true) => {
                tracing::info!(
                    "=== Skipping simulation batch: required templates were not processed ==="
                );
                ExecutionOutcome::Skipped
            }
            (_, false) => {
                tracing::info!("=== Skipping simulation batch ===");
                ExecutionOutcome::Skipped
            }
        };

        // 3. Auxiliary templates, independent of steps 1-2.
        let auxiliary = if flags.process_custom_templates {
            tracing::info!("=== Processing auxiliary templates ===");
            if templates.auxiliary.is_empty() {
                tracing::info!("No auxiliary templates found");
                Some(InstantiationReport::default())
            } else {
                let report = instantiator.instantiate(&templates.auxiliary, params, rules)?;
                log_instantiation(&report, "auxiliary");
                Some(report)
            }
        } else {
            tracing::info!("=== Skipping auxiliary templates ===");
            None
        };

        tracing::info!("=== Run complete ===");

        Ok(RunReport {
            required,
            execution,
            auxiliary,
        })
    }

    async fn execute(&self, report: &InstantiationReport) -> ExecutionOutcome {
        let (cases, macros) = report.execution_pairs();
        let excluded = report.failed_cases();
        if !excluded.is_empty() {
            tracing::warn!(
                cases = %excluded.join(", "),
                "Excluding cases with generation failures from execution",
            );
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let progress = tokio::spawn(log_job_events(rx));
        let executor = self.executor.clone().with_events(tx);

        let result = executor
            .execute(&cases, &macros, &self.settings.output_dir)
            .await;
        // Closing the last sender lets the progress logger drain and stop.
        drop(executor);
        let _ = progress.await;

        match result {
            Ok(summary) => {
                tracing::info!(
                    "Execution complete: {}/{} cases succeeded",
                    summary.success_count,
                    summary.total_count,
                );
                ExecutionOutcome::Completed(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "Simulation batch aborted");
                ExecutionOutcome::Aborted {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Log per-job progress until every sender is gone.
async fn log_job_events(mut rx: mpsc::UnboundedReceiver<JobEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            JobEvent::Started { job } => tracing::info!(
                case_id = %job.case_id,
                log = %job.log_path.display(),
                command = %job.command_line(),
                "Starting case",
            ),
            JobEvent::Finished(result) if result.success => {
                if let Some(warning) = &result.error {
                    tracing::warn!(case_id = %result.case_id, "{warning}");
                }
                tracing::info!(case_id = %result.case_id, "Case succeeded");
            }
            JobEvent::Finished(result) => tracing::error!(
                case_id = %result.case_id,
                exit_code = ?result.exit_code,
                error = result.error.as_deref().unwrap_or(""),
                "Case execution failed",
            ),
        }
    }
}

fn log_instantiation(report: &InstantiationReport, phase: &str) {
    for role in [
        TemplateRole::Case,
        TemplateRole::Macro,
        TemplateRole::Auxiliary,
    ] {
        for file in report.files(role) {
            tracing::info!(phase, role = ?role, path = %file.path.display(), "Generated file");
        }
    }
    for failure in &report.failures {
        tracing::error!(
            phase,
            case_id = %failure.case_id,
            path = %failure.path.display(),
            error = %failure.error,
            "Failed to write generated file",
        );
    }
    tracing::info!(
        phase,
        "Generated {} files for {} cases ({} failed writes)",
        report.generated.len(),
        report.case_count,
        report.failures.len(),
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
