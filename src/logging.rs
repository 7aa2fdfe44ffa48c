//! File-backed tracing setup
//!
//! The TUI owns the terminal, so log output goes to a file under the XDG
//! cache directory instead of stdout/stderr. Filtering follows `RUST_LOG`
//! (default `warn`); set `RUST_LOG=poemarket=debug` to watch upstream
//! traffic with `tail -f`.

use directories::ProjectDirs;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Log file name inside the cache directory
const LOG_FILE: &str = "poemarket.log";

/// Initializes the global tracing subscriber writing to the log file.
///
/// Returns the path of the log file, or `None` when no cache directory can
/// be determined or the file cannot be created — in that case logging is
/// simply disabled rather than corrupting the terminal.
pub fn init() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "poemarket")?;
    let dir = project_dirs.cache_dir().to_path_buf();
    fs::create_dir_all(&dir).ok()?;

    let path = dir.join(LOG_FILE);
    let file = File::create(&path).ok()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();

    Some(path)
}
