//! Logging setup.
//!
//! Two `tracing` layers:
//!
//! - console: compact, to stderr, `warn` by default (`info` with `--verbose`),
//!   `RUST_LOG` overrides
//! - file: one JSON object per event in `<log_dir>/winpersona.log`, crate
//!   events at `debug`, so install attempts keep their structured fields
//!   (`app`, `package_id`, `attempt`, `exit_code`, ...)

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub const LOG_FILE: &str = "winpersona.log";

/// Install the global subscriber. Returns the log file path when the file
/// layer is active.
///
/// If the log file cannot be opened the console layer is still installed and
/// the error is reported through it.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));
    let console = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let (file_layer, file_error, log_path) = match log_dir.map(open_log_file) {
        Some(Ok((file, path))) => {
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new("winpersona=debug"));
            (Some(layer), None, Some(path))
        }
        Some(Err(e)) => (None, Some(e), None),
        None => (None, None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(e) = file_error {
        tracing::warn!("File logging disabled: {:#}", e);
    }
    Ok(log_path)
}

fn open_log_file(dir: &Path) -> Result<(fs::File, PathBuf)> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {:?}", dir))?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;
    Ok((file, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (_, path) = open_log_file(&dir.path().join("a").join("b")).unwrap();
        assert!(path.exists());
        assert!(path.ends_with(LOG_FILE));
    }
}
