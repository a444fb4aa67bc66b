//! Subprocess launcher with log redirection.
//!
//! Provides [`ProcessLauncher`], the production [`JobLauncher`], and
//! [`run_command`], the spawn + wait logic it delegates to. Both output
//! streams of the child go straight to the job's log file.

use std::fs::OpenOptions;
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;

use super::executor::{JobLauncher, JobOutput, JobSpec, LaunchError};

/// Launches jobs as real child processes.
pub struct ProcessLauncher;

impl JobLauncher for ProcessLauncher {
    async fn launch(&self, job: &JobSpec) -> Result<JobOutput, LaunchError> {
        let mut cmd = Command::new(&job.executable);
        cmd.args(&job.args);
        run_command(&mut cmd, job).await
    }
}

/// Spawn `cmd` in the job's working directory with stdout and stderr
/// appended to the job log, and wait for it to exit.
///
/// The caller sets the program and arguments. The child is never killed:
/// dropping the returned future leaves it running.
pub async fn run_command(cmd: &mut Command, job: &JobSpec) -> Result<JobOutput, LaunchError> {
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&job.log_path)
        .map_err(|source| LaunchError::LogFile {
            path: job.log_path.clone(),
            source,
        })?;
    let log_err = log.try_clone().map_err(|source| LaunchError::LogFile {
        path: job.log_path.clone(),
        source,
    })?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .current_dir(&job.working_dir);

    let start = Instant::now();

    let mut child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LaunchError::NotFound(job.executable.clone()),
        _ => LaunchError::IoError(e),
    })?;

    let status = child.wait().await.map_err(LaunchError::IoError)?;

    Ok(JobOutput {
        exit_code: status.code().unwrap_or(-1),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
