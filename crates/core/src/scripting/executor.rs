//! Job launch interface and shared types.
//!
//! Defines [`JobLauncher`], the trait the batch executor drives, along with
//! [`JobSpec`], [`JobOutput`], and [`LaunchError`].

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// One external tool invocation for one case.
///
/// The command line is a program plus an ordered argument list; no shell is
/// involved, so arguments never need quoting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSpec {
    /// Identifier of the case this job simulates.
    pub case_id: String,
    /// Program to run, resolved through `PATH` when not absolute.
    pub executable: String,
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub working_dir: PathBuf,
    /// File receiving the combined stdout and stderr, opened for append.
    pub log_path: PathBuf,
}

impl JobSpec {
    /// The command line as it would be typed, for log messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a job that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobOutput {
    /// Process exit code (`-1` if killed by signal).
    pub exit_code: i32,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl JobOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors that prevent a job from running to completion.
#[derive(Debug)]
pub enum LaunchError {
    /// The executable could not be found.
    NotFound(String),
    /// The job log file could not be opened.
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// An I/O error occurred while spawning or waiting on the process.
    IoError(std::io::Error),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(program) => write!(f, "Executable not found: {program}"),
            Self::LogFile { path, source } => {
                write!(f, "Cannot open log file {}: {source}", path.display())
            }
            Self::IoError(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LogFile { source, .. } => Some(source),
            Self::IoError(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

/// Trait implemented by anything that can run a [`JobSpec`].
///
/// Implementations block (asynchronously) until the job has finished.
pub trait JobLauncher: Send + Sync {
    /// Run `job` and report its exit status.
    fn launch(
        &self,
        job: &JobSpec,
    ) -> impl std::future::Future<Output = Result<JobOutput, LaunchError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
