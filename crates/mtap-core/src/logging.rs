//! Logging init: `~/.local/state/mtap/mtap.log`, or stderr when that fails.
//!
//! The filter comes from `MTAP_LOG`, then `RUST_LOG`, then `info,mtap=debug`.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,mtap=debug";
const LOG_ENV: &str = "MTAP_LOG";

/// First non-blank directive among the mtap variable and `RUST_LOG`.
fn filter_directive(mtap: Option<String>, rust: Option<String>) -> String {
    mtap.into_iter()
        .chain(rust)
        .find(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn env_filter() -> EnvFilter {
    let directive = filter_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mtap")?;
    Ok(xdg_dirs.get_state_home().join("mtap").join("mtap.log"))
}

/// Log to the state-dir file. Errors if the file cannot be opened so the
/// caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir: {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;

    tracing::info!(pid = std::process::id(), "mtap logging to {}", path.display());
    Ok(())
}

/// Stderr-only logging. A no-op if a subscriber is already installed.
pub fn init_logging_stderr() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("subscriber already installed");
    }
}
