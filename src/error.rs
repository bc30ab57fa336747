use std::path::PathBuf;

use thiserror::Error as ThisError;

use crate::rotation::StepFailure;

/// Errors that can occur in the rotation library
#[derive(ThisError, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Initialization failed.
    #[error("Initialization error: {0}")]
    Init(String),
    /// Rotation ran to completion but one or more steps failed.
    #[error("rotation partially applied: {} step(s) failed", .0.len())]
    PartialRotation(Vec<StepFailure>),
}

/// Failure to append a record to the active log.
///
/// Logging is advisory: callers degrade on this error, they never abort the
/// operation being logged.
#[derive(ThisError, Debug)]
pub enum WriteError {
    /// The active log or its directory is missing or not writable.
    #[error("log file {} unavailable: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The record timestamp could not be rendered.
    #[error("Timestamp error: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl From<WriteError> for std::io::Error {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Unavailable { source, .. } => source,
            other => std::io::Error::other(other),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
