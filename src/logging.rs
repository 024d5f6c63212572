// src/logging.rs
//! Diagnostic logging setup.
//!
//! Logs go to stderr, or to a file when one is given, so they never mix
//! with the navigation output on stdout. The level is taken from `RUST_LOG`
//! and defaults to `warn`.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "warn";

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard flushes the background writer.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber.
///
/// With `log_file`, the file is truncated and written without ANSI colors.
/// Fails if the file cannot be created or a subscriber is already set.
pub fn init_logging(log_file: Option<&Path>) -> io::Result<LoggingGuard> {
    let (writer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = fs::File::create(path)?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(io::stderr()),
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(true);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard { _guard: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_to_log_file() {
        let dir = std::env::temp_dir().join(format!("gps-compass-logs-{}", std::process::id()));
        let path = dir.join("compass.log");

        let guard = init_logging(Some(&path)).unwrap();
        tracing::error!(port = "/dev/ttyUSB0", "Serial stream ended");
        drop(guard);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Serial stream ended"));
        assert!(contents.contains("/dev/ttyUSB0"));

        // A second subscriber is refused rather than panicking.
        assert!(init_logging(None).is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
