//! Error types for hourlog

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by sink setup and administration.
///
/// Runtime logging failures never reach the caller as a `LogError`; they are
/// absorbed by [`Logger::save`](crate::Logger::save) and reported as
/// diagnostics instead.
#[derive(Error, Debug)]
pub enum LogError {
    /// The rotating sink could not open or create its target file
    #[error("Failed to open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Closing the current file handle failed
    #[error("Failed to close log file: {0}")]
    Close(#[source] std::io::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogError {
    /// Convert into an `io::Error`, keeping the underlying kind where there is one.
    ///
    /// Used where the error has to travel through an `io::Write` implementation.
    pub fn into_io(self) -> std::io::Error {
        match self {
            LogError::Io(e) => e,
            LogError::Open { ref source, .. } => std::io::Error::new(source.kind(), self),
            LogError::Close(ref source) => std::io::Error::new(source.kind(), self),
        }
    }
}

/// Result type alias using LogError
pub type LogResult<T> = Result<T, LogError>;
