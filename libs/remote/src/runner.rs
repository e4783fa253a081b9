//! Command runner interface.

use std::sync::Arc;

use crate::{CommandResult, ExecError};

/// Runs a shell command on a named host.
///
/// Implementations must not interpret the command: a non-zero exit is
/// returned as `Ok` and only transport failures are `Err`.
pub trait CommandRunner {
    /// Run `command` on `host` and wait for it to finish.
    fn run(&self, host: &str, command: &str) -> Result<CommandResult, ExecError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, host: &str, command: &str) -> Result<CommandResult, ExecError> {
        (**self).run(host, command)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Box<T> {
    fn run(&self, host: &str, command: &str) -> Result<CommandResult, ExecError> {
        (**self).run(host, command)
    }
}

impl<T: CommandRunner + ?Sized> CommandRunner for Arc<T> {
    fn run(&self, host: &str, command: &str) -> Result<CommandResult, ExecError> {
        (**self).run(host, command)
    }
}
