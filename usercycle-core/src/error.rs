//! Error types for usercycle-core

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the usercycle-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while encoding or decoding a queued request
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The request never produced an HTTP response (DNS, refused, timeout)
    #[error("{0}")]
    Transport(String),

    /// The API answered with a non-2xx status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// A queue or log file could not be opened, written, renamed or removed
    #[error("filesystem error on {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for usercycle-core
pub type Result<T> = std::result::Result<T, Error>;
