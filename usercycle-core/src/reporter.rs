//! Error log next to the event queue
//!
//! Failures on the delivery and replay paths are never returned to callers;
//! they end up here as `[epochSeconds] message` lines.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::store::append_line;

/// Writes failures to `usercycle_error.log` and, optionally, stderr
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    path: PathBuf,
    mirror_to_stderr: bool,
}

impl ErrorReporter {
    pub fn new(path: impl Into<PathBuf>, mirror_to_stderr: bool) -> Self {
        Self {
            path: path.into(),
            mirror_to_stderr,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a failure. Never fails.
    ///
    /// If the error log itself cannot be written, the failure only goes to
    /// `tracing`; it is not reported again.
    pub fn report(&self, message: &str) {
        let entry = format_entry(Utc::now().timestamp(), message);

        tracing::error!(error_log = %self.path.display(), "{}", message);

        if let Err(e) = append_line(&self.path, &entry) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to write error log"
            );
        }

        if self.mirror_to_stderr {
            eprintln!("{}", entry);
        }
    }
}

/// `[epoch] message`, flattened to a single line
fn format_entry(epoch: i64, message: &str) -> String {
    let flat: String = message
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!("[{}] {}", epoch, flat)
}
