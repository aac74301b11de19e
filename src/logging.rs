//! File-based logging.
//!
//! The recorder owns the terminal while it runs, so log output goes to
//! daily-rotated files under the XDG state directory instead of stdout or
//! stderr. Rotated files older than a week are pruned at startup. The log
//! level comes from `RUST_LOG` and defaults to "info".

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;

/// Base name of the rolling log file; rotation appends `.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "tapedeck.log";

/// How many rotated files to keep.
const RETAINED_FILES: usize = 7;

/// Keeps the non-blocking writer's flush thread alive for the whole run.
static APPENDER_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Initializes the tracing subscriber with a daily-rolling file appender.
///
/// Must be called at most once per process.
///
/// # Errors
/// - If the log directory cannot be determined or created
/// - If logging was already initialized
pub fn init_logging() -> Result<(), anyhow::Error> {
    let log_dir = get_log_dir()?;

    if let Err(e) = prune_rotated_logs(&log_dir) {
        eprintln!("Warning: Failed to cleanup old logs: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    APPENDER_GUARD
        .set(guard)
        .map_err(|_| anyhow::anyhow!("Logging already initialized"))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_ansi(false),
        )
        .init();

    tracing::debug!("Logging initialized. Log file: {}", log_dir.display());
    Ok(())
}

/// The log directory: `$XDG_STATE_HOME/tapedeck`, or
/// `~/.local/state/tapedeck` when the variable is unset. Created if needed.
///
/// # Errors
/// - If home directory cannot be determined
/// - If the directory cannot be created
pub fn get_log_dir() -> Result<PathBuf, anyhow::Error> {
    let log_dir = if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        PathBuf::from(xdg_state).join("tapedeck")
    } else {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        home.join(".local/state/tapedeck")
    };

    fs::create_dir_all(&log_dir)?;

    Ok(log_dir)
}

/// Deletes rotated log files beyond the newest [`RETAINED_FILES`].
///
/// Only files named `tapedeck.log.YYYY-MM-DD` are considered; the live
/// unrotated file and anything else in the directory are left alone.
///
/// # Errors
/// - If the log directory cannot be read
fn prune_rotated_logs(log_dir: &Path) -> Result<(), anyhow::Error> {
    let rotated_prefix = format!("{LOG_FILE_PREFIX}.");

    let mut rotated: Vec<(PathBuf, std::time::SystemTime)> = fs::read_dir(log_dir)?
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            let name = path.file_name()?.to_str()?;
            let date_suffix = name.strip_prefix(&rotated_prefix)?;
            if date_suffix.matches('-').count() != 2 {
                return None;
            }
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, modified))
        })
        .collect();

    // Newest first; everything past the retention window goes
    rotated.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in rotated.into_iter().skip(RETAINED_FILES) {
        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!("Failed to delete old log file {}: {}", path.display(), e);
        }
    }

    Ok(())
}
