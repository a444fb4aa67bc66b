//! Parallel execution of the simulation tool over generated cases.
//!
//! [`BatchExecutor`] turns matched case/macro file pairs into jobs, queues
//! them in submission order, and runs them on a fixed number of worker
//! tasks. Each worker awaits one child process at a time, so at most
//! `parallelism` external processes are in flight. Outcomes come back over
//! a channel and are aggregated without relying on completion order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::error::CoreError;
use crate::naming::backup_file_name;
use crate::scripting::executor::{JobLauncher, JobSpec};

/// Subdirectory of the output directory holding per-job logs.
pub const EXECUTION_LOG_DIR: &str = "execution_logs";

/// Number of concurrent jobs when none is configured.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Default simulation executable.
pub const DEFAULT_SIM_EXECUTABLE: &str = "starccm+";

/// Timestamp format used in job log filenames.
const LOG_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// Command and result types
// ---------------------------------------------------------------------------

/// How to invoke the simulation tool for one case.
///
/// The command line is
/// `{executable} -np {workers_per_job} {extra_args..} {case} -batch {macro}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimCommand {
    pub executable: String,
    /// Worker processes the tool may use for a single job.
    pub workers_per_job: usize,
    /// Flags placed between the worker count and the case file.
    pub extra_args: Vec<String>,
}

impl Default for SimCommand {
    fn default() -> Self {
        Self {
            executable: DEFAULT_SIM_EXECUTABLE.to_string(),
            workers_per_job: 1,
            extra_args: vec!["-power".to_string()],
        }
    }
}

impl SimCommand {
    /// Argument list for one case, given the case and macro file names.
    pub fn args(&self, case_file_name: &str, macro_file_name: &str) -> Vec<String> {
        let mut args = vec!["-np".to_string(), self.workers_per_job.to_string()];
        args.extend(self.extra_args.iter().cloned());
        args.push(case_file_name.to_string());
        args.push("-batch".to_string());
        args.push(macro_file_name.to_string());
        args
    }
}

/// Outcome of one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub case_id: String,
    pub success: bool,
    /// Job log, `None` if the job never started.
    pub log_path: Option<PathBuf>,
    /// Process exit code, `None` if the process never ran to completion.
    pub exit_code: Option<i32>,
    /// Launch failure, or a backup cleanup problem on an otherwise
    /// successful job.
    pub error: Option<String>,
}

/// Aggregated outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub success_count: usize,
    pub total_count: usize,
    /// Per-case results sorted by case identifier.
    pub results: Vec<ExecutionResult>,
}

impl RunSummary {
    fn from_results(total_count: usize, mut results: Vec<ExecutionResult>) -> Self {
        results.sort_by(|a, b| a.case_id.cmp(&b.case_id));
        Self {
            success_count: results.iter().filter(|r| r.success).count(),
            total_count,
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// A worker picked up the job and is about to launch it.
    Started { job: JobSpec },
    /// The job settled, successfully or not.
    Finished(ExecutionResult),
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// A case waiting in the job queue.
#[derive(Debug, Clone)]
struct QueuedCase {
    case_id: String,
    case_file_name: String,
    macro_file_name: String,
}

impl QueuedCase {
    fn new(case_file: &Path, macro_file: &Path) -> Self {
        let case_id = case_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            case_id,
            case_file_name: file_name(case_file),
            macro_file_name: file_name(macro_file),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// State shared by all workers of one batch.
struct WorkerContext<L> {
    launcher: Arc<L>,
    command: SimCommand,
    output_dir: PathBuf,
    log_dir: PathBuf,
    events: Option<mpsc::UnboundedSender<JobEvent>>,
}

impl<L: JobLauncher> WorkerContext<L> {
    fn emit(&self, event: JobEvent) {
        if let Some(tx) = &self.events {
            // A dropped listener only loses progress output.
            let _ = tx.send(event);
        }
    }

    fn job_for(&self, case: &QueuedCase) -> JobSpec {
        let timestamp = chrono::Local::now().format(LOG_TIMESTAMP_FORMAT);
        JobSpec {
            case_id: case.case_id.clone(),
            executable: self.command.executable.clone(),
            args: self
                .command
                .args(&case.case_file_name, &case.macro_file_name),
            working_dir: self.output_dir.clone(),
            log_path: self
                .log_dir
                .join(format!("{}_{timestamp}.log", case.case_id)),
        }
    }

    /// Run one case to completion. Never fails: every error becomes a
    /// failed [`ExecutionResult`].
    async fn run(&self, case: QueuedCase) -> ExecutionResult {
        let job = self.job_for(&case);
        self.emit(JobEvent::Started { job: job.clone() });

        let mut result = ExecutionResult {
            case_id: case.case_id.clone(),
            success: false,
            log_path: Some(job.log_path.clone()),
            exit_code: None,
            error: None,
        };

        match self.launcher.launch(&job).await {
            Ok(output) => {
                result.exit_code = Some(output.exit_code);
                result.success = output.success();
                if result.success {
                    let backup = self
                        .output_dir
                        .join(backup_file_name(&case.case_file_name));
                    if let Err(e) = remove_if_present(&backup).await {
                        result.error = Some(format!(
                            "failed to remove backup {}: {e}",
                            backup.display()
                        ));
                    }
                }
            }
            Err(e) => result.error = Some(e.to_string()),
        }

        result
    }
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

async fn worker_loop<L: JobLauncher + 'static>(
    ctx: Arc<WorkerContext<L>>,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<QueuedCase>>>,
    results: mpsc::UnboundedSender<ExecutionResult>,
) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(case) = next else {
            break;
        };
        let result = ctx.run(case).await;
        ctx.emit(JobEvent::Finished(result.clone()));
        if results.send(result).is_err() {
            break;
        }
    }
}

/// Runs the simulation tool over case/macro pairs with bounded concurrency.
pub struct BatchExecutor<L> {
    launcher: Arc<L>,
    command: SimCommand,
    parallelism: usize,
    events: Option<mpsc::UnboundedSender<JobEvent>>,
}

// Manual impl: cloning shares the launcher, so `L` need not be `Clone`.
impl<L> Clone for BatchExecutor<L> {
    fn clone(&self) -> Self {
        Self {
            launcher: Arc::clone(&self.launcher),
            command: self.command.clone(),
            parallelism: self.parallelism,
            events: self.events.clone(),
        }
    }
}

impl<L: JobLauncher + 'static> BatchExecutor<L> {
    /// Create an executor running at most `parallelism` jobs at once.
    ///
    /// A parallelism of zero is treated as one.
    pub fn new(launcher: L, command: SimCommand, parallelism: usize) -> Self {
        Self {
            launcher: Arc::new(launcher),
            command,
            parallelism: parallelism.max(1),
            events: None,
        }
    }

    /// Send [`JobEvent`]s to `tx` while batches run.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<JobEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run one job per `(case_files[i], macro_files[i])` pair.
    ///
    /// Jobs run with `output_dir` as working directory and log to
    /// `output_dir/execution_logs`. Returns
    /// [`CoreError::PairingMismatch`] without launching anything when the
    /// list lengths differ. Individual job failures never make this fail.
    pub async fn execute(
        &self,
        case_files: &[PathBuf],
        macro_files: &[PathBuf],
        output_dir: &Path,
    ) -> Result<RunSummary, CoreError> {
        if case_files.len() != macro_files.len() {
            return Err(CoreError::PairingMismatch {
                cases: case_files.len(),
                macros: macro_files.len(),
            });
        }

        let log_dir = output_dir.join(EXECUTION_LOG_DIR);
        tokio::fs::create_dir_all(&log_dir)
            .await
            .map_err(|e| CoreError::io(&log_dir, e))?;

        let queued: Vec<QueuedCase> = case_files
            .iter()
            .zip(macro_files)
            .map(|(c, m)| QueuedCase::new(c, m))
            .collect();
        let total_count = queued.len();
        if total_count == 0 {
            return Ok(RunSummary::default());
        }
        let expected: Vec<String> = queued.iter().map(|q| q.case_id.clone()).collect();

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        for case in queued {
            // The receiver is alive until the workers drain it.
            let _ = queue_tx.send(case);
        }
        drop(queue_tx);
        let queue = Arc::new(Mutex::new(queue_rx));

        let ctx = Arc::new(WorkerContext {
            launcher: Arc::clone(&self.launcher),
            command: self.command.clone(),
            output_dir: output_dir.to_path_buf(),
            log_dir,
            events: self.events.clone(),
        });

        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let mut workers = JoinSet::new();
        for _ in 0..self.parallelism.min(total_count) {
            workers.spawn(worker_loop(
                Arc::clone(&ctx),
                Arc::clone(&queue),
                result_tx.clone(),
            ));
        }
        drop(result_tx);

        // A panicking worker loses at most its in-flight case, which is
        // reported as failed below.
        while workers.join_next().await.is_some() {}

        let mut results = Vec::with_capacity(total_count);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }

        let reported: HashSet<String> = results.iter().map(|r| r.case_id.clone()).collect();
        for case_id in expected {
            if !reported.contains(&case_id) {
                results.push(ExecutionResult {
                    case_id,
                    success: false,
                    log_path: None,
                    exit_code: None,
                    error: Some("worker stopped before reporting a result".to_string()),
                });
            }
        }

        Ok(RunSummary::from_results(total_count, results))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
