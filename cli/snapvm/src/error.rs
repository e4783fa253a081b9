//! Error display for the CLI.

use colored::Colorize;
use snapvm_remote::ExecError;
use snapvm_vm::{ConfigError, VmError};

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint(err: &anyhow::Error) -> Option<&'static str> {
    let config = err
        .downcast_ref::<ConfigError>()
        .or_else(|| match err.downcast_ref::<VmError>() {
            Some(VmError::Config(e)) => Some(e),
            _ => None,
        });
    if let Some(config) = config {
        return match config {
            ConfigError::MissingProvisioningServer => {
                Some("Pass --provisioning-server or set it in the [clients] section.")
            }
            ConfigError::UnsupportedDistro { .. } => Some("Run `snapvm distros` to list them."),
            ConfigError::Parse { .. } | ConfigError::Read { .. } => {
                Some("Check the file given with --config (or SNAPVM_CONFIG).")
            }
            _ => None,
        };
    }

    let exec = err
        .downcast_ref::<ExecError>()
        .or_else(|| match err.downcast_ref::<VmError>() {
            Some(VmError::Exec(e)) => Some(e),
            _ => None,
        });
    match exec {
        Some(ExecError::Connection { .. }) => {
            Some("Check the host is reachable and the [ssh] identity_file is authorized.")
        }
        Some(ExecError::Spawn { .. }) => Some("Make sure an ssh client is installed (see [ssh] program)."),
        _ => None,
    }
}
