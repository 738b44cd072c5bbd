//! Diagnostic logging for usercycle
//!
//! Library code only emits `tracing` events. The drain binary calls [`init`]
//! to route them to daily `usercycle-drain.*.log` files in the configured
//! logging directory. This is separate from the error log kept next to the
//! event queue (see [`crate::reporter`]).

use crate::config::LoggingConfig;
use crate::error::{Error, Result};
use std::io::IsTerminal;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "usercycle-drain";
const LOG_FILE_SUFFIX: &str = "log";

/// Initialize logging for a drain run
///
/// Writes to `config.log_dir()`, keeping at most `config.max_files` daily
/// files. With `echo_stderr` the same events are also printed to stderr.
/// `RUST_LOG` overrides the configured level.
pub fn init(config: &LoggingConfig, echo_stderr: bool) -> Result<LoggingGuard> {
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = file_appender(&log_dir, config.max_files)?;

    // A drain run is short-lived; the guard flushes whatever is still buffered
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = echo_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install logger: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Daily-rotating appender in `dir`, pruned to `max_files`
fn file_appender(dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(max_files.max(1))
        .build(dir)
        .map_err(|e| {
            Error::Config(format!(
                "failed to open log directory {}: {}",
                dir.display(),
                e
            ))
        })
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn log_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_file_appender_writes_dated_drain_log() {
        let dir = TempDir::new().unwrap();
        let mut appender = file_appender(dir.path(), 3).unwrap();
        appender.write_all(b"Starting drain\n").unwrap();
        appender.flush().unwrap();

        let files = log_files(dir.path());
        assert_eq!(files.len(), 1);
        let name = &files[0];
        assert!(name.starts_with("usercycle-drain."), "{}", name);
        assert!(name.ends_with(".log"), "{}", name);

        let content = std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(content, "Starting drain\n");
    }

    #[test]
    fn test_file_appender_rejects_file_as_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "").unwrap();

        assert!(matches!(file_appender(&file, 3), Err(Error::Config(_))));
    }

    #[test]
    fn test_configured_dir_is_used() {
        let dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            dir: Some(dir.path().to_path_buf()),
            ..LoggingConfig::default()
        };
        assert_eq!(config.log_dir(), dir.path());
    }
}
