//! Tracing setup for the `simbatch` binary.
//!
//! Events go to stdout and, when a log directory is given, to a
//! timestamped run log written through a non-blocking appender.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "simbatch_worker=info,simbatch_pipeline=info,simbatch_core=info";

/// Run log file name for a run started at `started`.
pub fn run_log_file_name(started: DateTime<Local>) -> String {
    format!("simbatch_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber.
///
/// Returns the path of the run log and the guard that flushes it; keep the
/// guard alive until the program exits. Fails only if the run log cannot be
/// created, in which case nothing is installed.
pub fn init(log_dir: Option<&Path>) -> std::io::Result<Option<(PathBuf, WorkerGuard)>> {
    let (file_layer, run_log) = match log_dir {
        Some(dir) => {
            let path = dir.join(run_log_file_name(Local::now()));
            let file = File::create(&path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some((path, guard)))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(run_log)
}
