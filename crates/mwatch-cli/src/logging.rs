// Diagnostics go to a file; the terminal belongs to the panel.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::Level;

use crate::error::{CliError, CliResult};

/// Map a configured level name to a tracing level
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Explicit path if given, else `<cache dir>/mwatch/mwatch.log`
pub fn resolve_log_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("mwatch")
            .join("mwatch.log"),
    }
}

/// Install the global subscriber, appending plain lines to `path`
///
/// `--verbose` forces debug level regardless of the configured one.
pub fn init_logging(level: &str, verbose: bool, path: &Path) -> CliResult<()> {
    use tracing_subscriber::fmt;

    let level = if verbose { Level::DEBUG } else { parse_level(level) };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CliError::Logging(format!("{}: {}", parent.display(), e)))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CliError::Logging(format!("{}: {}", path.display(), e)))?;

    fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_target(verbose)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;

    tracing::info!(path = %path.display(), level = %level, "Logging initialized");
    Ok(())
}
