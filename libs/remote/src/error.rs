//! Transport-level errors.

use thiserror::Error;

/// Errors raised when a command could not be executed on the remote host.
///
/// A command that ran and exited non-zero is not an error at this level; it
/// is an `Ok(CommandResult)` carrying that exit code.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The local client process could not be started.
    #[error("failed to start remote client for {host}: {source}")]
    Spawn {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// The client started but never reached a shell on the host
    /// (unreachable, DNS, authentication, host key).
    #[error("connection to {host} failed: {stderr}")]
    Connection { host: String, stderr: String },

    /// The client was killed by a signal before reporting an exit status.
    #[error("remote client for {host} terminated without an exit status")]
    Terminated { host: String },
}

impl ExecError {
    /// Host the failed command was addressed to.
    pub fn host(&self) -> &str {
        match self {
            ExecError::Spawn { host, .. }
            | ExecError::Connection { host, .. }
            | ExecError::Terminated { host } => host,
        }
    }

    /// Returns true if the failure happened before reaching the host.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, ExecError::Connection { .. })
    }
}
