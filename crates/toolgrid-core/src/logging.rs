//! File logging.
//!
//! The dashboard owns stdout and draws with absolute cursor moves, so log
//! lines go to `$TOOLGRID_HOME/logs/toolgrid.log` instead of the terminal.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Flushes buffered log lines when dropped.
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

/// Environment variable holding the log filter (`RUST_LOG` syntax).
pub const LOG_ENV: &str = "TOOLGRID_LOG";

const LOG_FILE_NAME: &str = "toolgrid.log";

/// Installs the global subscriber writing to `dir/toolgrid.log`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes buffered lines.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(dir: &Path) -> Result<LogGuard> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}
