//! Structured outcome of a remote command.

use serde::Serialize;

/// Exit code and captured output of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Exit status of the remote command.
    pub return_code: i32,
    /// Standard output split into lines, without line terminators.
    pub stdout: Vec<String>,
    /// Standard error as captured.
    pub stderr: String,
}

impl CommandResult {
    /// Build a result from raw captured streams.
    pub fn from_output(return_code: i32, stdout: &[u8], stderr: &[u8]) -> Self {
        Self {
            return_code,
            stdout: String::from_utf8_lossy(stdout)
                .lines()
                .map(str::to_string)
                .collect(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.return_code == 0
    }

    /// Standard output joined back with newlines.
    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }
}
