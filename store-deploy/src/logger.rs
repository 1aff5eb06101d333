//! Console plus `deployment.log` output

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_FILE: &str = "deployment.log";

/// Install the subscriber. Keep the guard alive until exit or buffered
/// file lines are lost.
pub fn init_logger(project_root: &Path) -> anyhow::Result<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Append, never truncate, across runs
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(project_root.join(LOG_FILE))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().compact().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer),
        )
        .try_init()?;

    Ok(guard)
}
