//! External tool invocation.
//!
//! Jobs are described by a structured [`executor::JobSpec`] and launched
//! through the [`executor::JobLauncher`] trait, so the batch executor can be
//! driven by a fake launcher in tests. All subprocess management lives here.

pub mod executor;
pub mod subprocess;

/// Shared test helpers for launcher tests.
#[cfg(test)]
pub(crate) mod test_helpers {
    use std::path::Path;

    use super::executor::JobSpec;

    /// Build a [`JobSpec`] that runs `script` through `sh -c` inside `dir`,
    /// logging to `dir/job.log`.
    pub fn sh_job(dir: &Path, script: &str) -> JobSpec {
        JobSpec {
            case_id: "Case1".to_string(),
            executable: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            working_dir: dir.to_path_buf(),
            log_path: dir.join("job.log"),
        }
    }
}
