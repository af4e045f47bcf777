//! # Report Error Types
//!
//! Failures while writing documents or handing them to the OS.

use std::path::PathBuf;
use thiserror::Error;

/// Document and print errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The output directory or document could not be written.
    #[error("Could not write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document to open or print does not exist.
    #[error("Document not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The helper program (lpr, lpstat, xdg-open, ...) is not installed.
    #[error("'{0}' is not available on this system")]
    CommandNotFound(String),

    /// The helper program could not be started.
    #[error("Could not run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The helper program exited with a failure status.
    #[error("'{command}' failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

impl ReportError {
    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Write {
            path: path.into(),
            source,
        }
    }
}

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;
