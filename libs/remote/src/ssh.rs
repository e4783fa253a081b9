//! SSH command runner.
//!
//! Shells out to the system `ssh` client, one process per command. No
//! connection is kept between calls.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{CommandResult, CommandRunner, ExecError};

/// Exit status the OpenSSH client reserves for its own failures.
pub const SSH_CONNECTION_FAILURE: i32 = 255;

/// Options for the `ssh` client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshOptions {
    /// Client binary.
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Remote login user.
    #[serde(default = "default_user")]
    pub user: String,

    /// Remote port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Private key to authenticate with.
    #[serde(default)]
    pub identity_file: Option<PathBuf>,

    /// Seconds to wait for the TCP connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Verify host keys. Off by default: guests are recreated with fresh keys
    /// on every run.
    #[serde(default)]
    pub strict_host_key_checking: bool,
}

fn default_program() -> PathBuf {
    PathBuf::from("ssh")
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            program: default_program(),
            user: default_user(),
            port: default_port(),
            identity_file: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            strict_host_key_checking: false,
        }
    }
}

/// Runs commands through the system `ssh` client.
#[derive(Debug, Clone, Default)]
pub struct SshRunner {
    options: SshOptions,
}

impl SshRunner {
    /// Create a runner with the given client options.
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    /// Client options in use.
    pub fn options(&self) -> &SshOptions {
        &self.options
    }

    /// Build the client invocation for `command` on `host`.
    pub fn build_command(&self, host: &str, command: &str) -> Command {
        let opts = &self.options;
        let mut cmd = Command::new(&opts.program);

        cmd.arg("-o").arg("BatchMode=yes");
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", opts.connect_timeout_secs));
        if !opts.strict_host_key_checking {
            cmd.arg("-o").arg("StrictHostKeyChecking=no");
            cmd.arg("-o").arg("UserKnownHostsFile=/dev/null");
            cmd.arg("-o").arg("LogLevel=ERROR");
        }
        cmd.arg("-p").arg(opts.port.to_string());
        if let Some(identity) = &opts.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg("-l").arg(&opts.user);
        cmd.arg(host);
        cmd.arg(command);

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl CommandRunner for SshRunner {
    fn run(&self, host: &str, command: &str) -> Result<CommandResult, ExecError> {
        debug!(host = %host, command = %command, "Running remote command");

        let output = self
            .build_command(host, command)
            .output()
            .map_err(|source| ExecError::Spawn {
                host: host.to_string(),
                source,
            })?;

        let Some(code) = output.status.code() else {
            warn!(host = %host, "ssh client terminated by signal");
            return Err(ExecError::Terminated {
                host: host.to_string(),
            });
        };

        if code == SSH_CONNECTION_FAILURE {
            return Err(ExecError::Connection {
                host: host.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let result = CommandResult::from_output(code, &output.stdout, &output.stderr);
        debug!(
            host = %host,
            return_code = result.return_code,
            stdout_lines = result.stdout.len(),
            "Remote command finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_default_options() {
        let opts = SshOptions::default();
        assert_eq!(opts.user, "root");
        assert_eq!(opts.port, 22);
        assert_eq!(opts.connect_timeout_secs, 10);
        assert!(!opts.strict_host_key_checking);
    }

    #[test]
    fn test_build_command_defaults() {
        let runner = SshRunner::default();
        let cmd = runner.build_command("prov.example.com", "virsh list");

        assert_eq!(cmd.get_program(), "ssh");
        let args = args(&cmd);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        assert_eq!(
            &args[args.len() - 4..],
            &["-l", "root", "prov.example.com", "virsh list"]
        );
    }

    #[test]
    fn test_build_command_identity_and_port() {
        let runner = SshRunner::new(SshOptions {
            identity_file: Some(PathBuf::from("/keys/id_rsa")),
            port: 2222,
            user: "cloud-user".to_string(),
            strict_host_key_checking: true,
            ..Default::default()
        });
        let args = args(&runner.build_command("10.0.0.5", "true"));

        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], "/keys/id_rsa");
        let p = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[p + 1], "2222");
        assert!(args.contains(&"cloud-user".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("StrictHostKeyChecking")));
    }

    #[test]
    fn test_command_is_single_argument() {
        let runner = SshRunner::default();
        let args = args(&runner.build_command("h", "rpm -q katello-agent && echo ok"));
        assert_eq!(args.last().unwrap(), "rpm -q katello-agent && echo ok");
    }
}
