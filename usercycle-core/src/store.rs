//! On-disk queue and log files
//!
//! Every file lives directly in the client's log directory:
//!
//! ```text
//! usercycle_event.log               - active queue, one JSON request per line
//! {epochSeconds}.usercycle_send.log - snapshot being drained
//! usercycle_error.log               - timestamped error lines
//! ```
//!
//! Appends are a single write of one whole line to a file opened in append
//! mode, so concurrent writers never interleave within a line. A drain renames
//! the active queue to a `send` snapshot before reading it; writers that come
//! later simply create a new active queue.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;

use crate::error::{Error, Result};

const EVENT_LOG: &str = "usercycle_event.log";
const ERROR_LOG: &str = "usercycle_error.log";
const SEND_SUFFIX: &str = ".usercycle_send.log";

/// Logical name of a file owned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Active queue being appended to
    Event,
    /// Queue snapshot being drained
    Send,
    /// Error log
    Error,
}

/// Queue and log files in one log directory
#[derive(Debug)]
pub struct EventLogStore {
    log_dir: PathBuf,
    /// Resolved `event`/`error` paths, filled on first use
    paths: Mutex<HashMap<LogKind, PathBuf>>,
}

impl EventLogStore {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            paths: Mutex::new(HashMap::new()),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Concrete path for a logical name
    ///
    /// `Send` has no fixed path; every call names a fresh snapshot for the
    /// current second that does not exist yet.
    pub fn path(&self, kind: LogKind) -> PathBuf {
        let file_name = match kind {
            LogKind::Event => EVENT_LOG,
            LogKind::Error => ERROR_LOG,
            LogKind::Send => return self.fresh_snapshot_path(),
        };

        let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
        paths
            .entry(kind)
            .or_insert_with(|| self.log_dir.join(file_name))
            .clone()
    }

    /// Whether the file for `kind` is present (`Send`: any snapshot)
    pub fn exists(&self, kind: LogKind) -> bool {
        match kind {
            LogKind::Send => self.snapshots().map(|s| !s.is_empty()).unwrap_or(false),
            _ => self.path(kind).is_file(),
        }
    }

    /// Append `line` plus a newline to the file for `kind`, creating it if needed
    pub fn append(&self, kind: LogKind, line: &str) -> Result<()> {
        let path = self.path(kind);
        append_line(&path, line).map_err(|e| Error::filesystem(&path, e))
    }

    /// Move the active queue aside so it can be drained
    ///
    /// Returns the snapshot path, or `None` when there is no active queue.
    pub fn rotate(&self) -> Result<Option<PathBuf>> {
        let event_log = self.path(LogKind::Event);
        if !event_log.is_file() {
            return Ok(None);
        }

        let snapshot = self.path(LogKind::Send);
        match fs::rename(&event_log, &snapshot) {
            Ok(()) => {
                tracing::debug!(
                    from = %event_log.display(),
                    to = %snapshot.display(),
                    "Rotated event queue"
                );
                Ok(Some(snapshot))
            }
            // Another drain got there first
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::filesystem(&event_log, e)),
        }
    }

    /// Lazily read the raw lines of a queue file
    ///
    /// Lines are bytes without the trailing newline; decoding is left to the
    /// caller so one corrupt line does not end the iteration.
    pub fn lines(&self, path: &Path) -> Result<LogLines> {
        let file = File::open(path).map_err(|e| Error::filesystem(path, e))?;
        Ok(LogLines {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
        })
    }

    /// Delete a drained snapshot
    pub fn remove(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| Error::filesystem(path, e))
    }

    /// Snapshots left in the log directory, oldest first
    pub fn snapshots(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.log_dir).map_err(|e| Error::filesystem(&self.log_dir, e))?;

        let mut snapshots: Vec<(u64, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::filesystem(&self.log_dir, e))?;
            let name = entry.file_name();
            let Some(epoch) = name.to_str().and_then(snapshot_epoch) else {
                continue;
            };
            snapshots.push((epoch, entry.path()));
        }

        snapshots.sort();
        Ok(snapshots.into_iter().map(|(_, path)| path).collect())
    }

    fn fresh_snapshot_path(&self) -> PathBuf {
        let mut epoch = Utc::now().timestamp().max(0) as u64;
        loop {
            let candidate = self.log_dir.join(format!("{}{}", epoch, SEND_SUFFIX));
            if !candidate.exists() {
                return candidate;
            }
            epoch += 1;
        }
    }
}

/// Epoch prefix of a `{epochSeconds}.usercycle_send.log` file name
fn snapshot_epoch(file_name: &str) -> Option<u64> {
    file_name.strip_suffix(SEND_SUFFIX)?.parse().ok()
}

/// Append one line with a single write
pub(crate) fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(buf.as_bytes())
}

/// Line iterator over a queue file; the file closes when this is dropped
pub struct LogLines {
    path: PathBuf,
    reader: BufReader<File>,
}

impl Iterator for LogLines {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.last() == Some(&b'\n') {
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(Error::filesystem(&self.path, e))),
        }
    }
}
