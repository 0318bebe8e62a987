//! Errors raised while executing host commands.

use thiserror::Error;

/// Errors surfaced by [`super::RemoteExecutor`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ExecError {
    /// Raised when the shell or SSH client cannot be started.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when the command exits with a non-zero status or is killed.
    #[error("command on {host} failed with status {status_text}: {command}")]
    CommandFailure {
        /// Host the command targeted.
        host: String,
        /// Full command line, including the shell or SSH prefix.
        command: String,
        /// Exit code reported by the OS; `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
}
