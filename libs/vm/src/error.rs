//! Error types for virtual machine management.

use std::path::PathBuf;

use snapvm_remote::ExecError;
use thiserror::Error;

/// Invalid or missing configuration. Always raised before any remote action.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{distro} is not a supported distro. Choose one of {supported}")]
    UnsupportedDistro { distro: String, supported: String },

    #[error(
        "a provisioning server must be provided: set `provisioning_server` in the \
         [clients] section of the settings file, export SNAPVM_PROVISIONING_SERVER, \
         or pass one explicitly"
    )]
    MissingProvisioningServer,

    #[error("invalid resources: {0}")]
    InvalidResources(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read settings from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings from {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine the user configuration directory")]
    NoConfigDir,
}

/// Errors from virtual machine operations.
#[derive(Debug, Error)]
pub enum VmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// snap-guest or the reachability probe failed during `create`.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    #[error("the virtual machine must be created before running commands")]
    NotCreated,

    #[error("virtual machine {hostname} was destroyed and cannot be created again")]
    Destroyed { hostname: String },

    /// An install step ran but the package is not there afterwards.
    #[error("failed to install {package} on {hostname}: package not found after install")]
    PackageMissing { package: String, hostname: String },

    #[error("failed to download and install the katello-ca rpm from {url} on {hostname}: {stderr}")]
    CertInstall {
        url: String,
        hostname: String,
        stderr: String,
    },

    #[error("`{command}` exited with status {return_code} on {hostname}: {stderr}")]
    CommandFailed {
        command: String,
        hostname: String,
        return_code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl VmError {
    /// Stable reason code, used in machine-readable output.
    pub fn reason_code(&self) -> &'static str {
        match self {
            VmError::Config(_) => "config_invalid",
            VmError::Provisioning(_) => "provisioning_failed",
            VmError::NotCreated => "not_created",
            VmError::Destroyed { .. } => "destroyed",
            VmError::PackageMissing { .. } => "package_missing",
            VmError::CertInstall { .. } => "cert_install_failed",
            VmError::CommandFailed { .. } => "command_failed",
            VmError::Exec(_) => "exec_failed",
        }
    }
}
