//! snapvm remote command execution.
//!
//! Runs shell commands on a named host and hands back the exit status and
//! captured output. Callers decide success from the return code; transport
//! problems (the client could not start, the host was unreachable, the
//! client was killed) are reported separately as [`ExecError`].
//!
//! ## Modules
//!
//! - `result`: [`CommandResult`], the structured outcome of one command
//! - `runner`: the [`CommandRunner`] seam used by everything above this crate
//! - `ssh`: [`SshRunner`], one `ssh` client process per call

mod error;
mod result;
mod runner;
mod ssh;

pub use error::ExecError;
pub use result::CommandResult;
pub use runner::CommandRunner;
pub use ssh::{SshOptions, SshRunner, SSH_CONNECTION_FAILURE};
