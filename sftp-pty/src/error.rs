//! Error types for sftp-pty.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for session operations.
///
/// Every variant records the operation that failed, and the rendered
/// message is prefixed with it (`list: /srv/data not found`).
#[derive(Error, Debug)]
pub enum Error {
    /// The connection configuration cannot be used.
    #[error("{op}: invalid configuration: {message}")]
    Configuration { op: &'static str, message: String },

    /// The sftp process failed to start, died, or could not be talked to.
    #[error("{op}: {source}")]
    Connection {
        op: &'static str,
        #[source]
        source: ProcessError,
    },

    /// A command was issued while no process is running.
    #[error("{op}: no sftp connection available")]
    NoConnection { op: &'static str },

    /// The session is in a state where the operation is not allowed.
    #[error("{op}: session is {state}")]
    InvalidState { op: &'static str, state: String },

    /// A listing reported the target path as absent.
    #[error("{op}: {path} not found")]
    NotFound { op: &'static str, path: String },

    /// A path could not be resolved to an existing absolute path.
    #[error("{op}: {path} does not exist")]
    PathResolution { op: &'static str, path: String },

    /// The response did not contain the expected structured line.
    #[error("{op}: unexpected response: {message}")]
    Parse { op: &'static str, message: String },

    /// No prompt arrived within the configured timeout.
    #[error("{op}: no response within {duration:?}")]
    Timeout { op: &'static str, duration: Duration },
}

impl Error {
    /// The operation that produced this error.
    pub fn op(&self) -> &'static str {
        match self {
            Error::Configuration { op, .. }
            | Error::Connection { op, .. }
            | Error::NoConnection { op }
            | Error::InvalidState { op, .. }
            | Error::NotFound { op, .. }
            | Error::PathResolution { op, .. }
            | Error::Parse { op, .. }
            | Error::Timeout { op, .. } => *op,
        }
    }
}

/// Errors raised by the spawned client process.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started.
    #[error("failed to start '{program}': {message}")]
    Spawn { program: String, message: String },

    /// Reading from or writing to the terminal failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The process exited before the exchange completed.
    #[error("process exited with code {code}")]
    Exited { code: u32 },

    /// The process reported an error.
    #[error("process error: {0}")]
    Failed(String),

    /// A password prompt appeared but no password is configured.
    #[error("password prompt received but no password configured")]
    PasswordRequired,

    /// The output stream ended.
    #[error("process output closed")]
    Closed,
}

/// Result type alias using sftp-pty's Error.
pub type Result<T> = std::result::Result<T, Error>;
