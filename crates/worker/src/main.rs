//! `simbatch` -- batch case generator and runner for STAR-CCM+.
//!
//! Reads a TOML configuration and a CSV case plan, writes one case file and
//! one macro per case, runs the simulation tool over them, then generates
//! the auxiliary per-case files.
//!
//! # Environment variables
//!
//! | Variable          | Required | Default             | Description                    |
//! |-------------------|----------|---------------------|--------------------------------|
//! | `SIMBATCH_CONFIG` | no       | `simbatch.toml`     | Path of the configuration file |
//! | `RUST_LOG`        | no       | `simbatch_*=info`   | Tracing filter directives      |

use std::process::ExitCode;

use simbatch_worker::config::BatchConfig;
use simbatch_worker::{logging, run};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = BatchConfig::from_env();

    let log_dir = config.as_ref().ok().map(|c| c.template_dir().to_path_buf());
    let (run_log, _guard) = match logging::init(log_dir.as_deref()) {
        Ok(Some((path, guard))) => (Some(path), Some(guard)),
        Ok(None) => (None, None),
        Err(e) => {
            // Nothing was installed yet, so console-only logging still works.
            let _ = logging::init(None);
            tracing::warn!(error = %e, "Run log file unavailable, logging to stdout only");
            (None, None)
        }
    };

    tracing::info!("=== simbatch starting ===");
    if let Some(path) = &run_log {
        tracing::info!(path = %path.display(), "Writing run log");
    }

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match run::run(&config).await {
        Ok(_) => {
            tracing::info!("=== simbatch finished ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
