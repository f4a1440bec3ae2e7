//! Log sink setup.
//!
//! With `logFile` set, every run writes to a fresh timestamped file
//! (`sftpx.log` → `sftpx-2026-10-18_09-30-00.log`) inside `logDir`.
//! Without it, logs go to stderr. `RUST_LOG` overrides the default `info`
//! filter either way.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::{fmt, EnvFilter};

use sftpx_core::Config;

use crate::error::{io_err, DaemonError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Install the global subscriber described by `config`.
///
/// Returns the log file path when logging to a file. A subscriber that is
/// already installed is left in place.
pub fn init(config: &Config) -> Result<Option<PathBuf>, DaemonError> {
    let Some(file_name) = &config.log_file else {
        init_stderr();
        return Ok(None);
    };

    if let Some(dir) = &config.log_dir {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let path = log_file_path(config.log_dir.as_deref(), file_name, Local::now());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;

    let _ = fmt()
        .with_env_filter(default_filter())
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    tracing::info!(path = %path.display(), "logging initialized");
    Ok(Some(path))
}

/// Install a stderr subscriber.
pub fn init_stderr() {
    let _ = fmt()
        .with_env_filter(default_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// `<dir>/<stem>-<timestamp><.ext>` for the configured `file_name`.
pub fn log_file_path(dir: Option<&Path>, file_name: &str, now: DateTime<Local>) -> PathBuf {
    let name = Path::new(file_name);
    let stamp = now.format(TIMESTAMP_FORMAT);
    let stem = name
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sftpx".to_string());
    let stamped = match name.extension() {
        Some(ext) => format!("{stem}-{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{stamp}"),
    };
    let relative = name.with_file_name(stamped);
    match dir {
        Some(dir) => dir.join(relative),
        None => relative,
    }
}
