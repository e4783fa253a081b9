//! Helpers that turn a fresh guest into a usable content host.
//!
//! Each helper is one or more [`run`](VirtualMachine::run) calls followed by
//! a check, so all of them require a created machine.

use snapvm_remote::{CommandResult, CommandRunner};
use tracing::{debug, info};

use crate::commands::{self, KATELLO_AGENT};
use crate::{VirtualMachine, VmError};

impl<R: CommandRunner> VirtualMachine<R> {
    fn display_name(&self) -> String {
        self.hostname()
            .map(str::to_string)
            .unwrap_or_else(|| self.target_image().to_string())
    }

    /// Run `command` and fail unless it exits zero.
    pub fn run_checked(&self, command: &str) -> Result<CommandResult, VmError> {
        let result = self.run(command)?;
        if !result.success() {
            return Err(VmError::CommandFailed {
                command: command.to_string(),
                hostname: self.display_name(),
                return_code: result.return_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }

    fn ensure_package(&self, package: &str) -> Result<(), VmError> {
        let result = self.run(&commands::query_package(package))?;
        if !result.success() {
            return Err(VmError::PackageMissing {
                package: package.to_string(),
                hostname: self.display_name(),
            });
        }
        debug!(hostname = %self.display_name(), package, "Package present");
        Ok(())
    }

    /// Enable a repository through subscription-manager.
    pub fn enable_repo(&self, repo: &str) -> Result<(), VmError> {
        info!(hostname = %self.display_name(), repo, "Enabling repository");
        self.run_checked(&commands::enable_repo(repo))?;
        Ok(())
    }

    /// Fetch `<package>.rpm` from a plain HTTP directory and install it.
    ///
    /// Only the final package query decides success.
    pub fn download_install_rpm(&self, repo_url: &str, package: &str) -> Result<(), VmError> {
        info!(hostname = %self.display_name(), repo_url, package, "Installing rpm from URL");

        let fetched = self.run(&commands::fetch_rpm(repo_url, package))?;
        debug!(package, return_code = fetched.return_code, "wget finished");
        let installed = self.run(&commands::install_local_rpm(package))?;
        debug!(package, return_code = installed.return_code, "rpm -i finished");

        self.ensure_package(package)
    }

    /// Install the management agent from the enabled repositories.
    pub fn install_katello_agent(&self) -> Result<(), VmError> {
        info!(hostname = %self.display_name(), "Installing katello-agent");
        self.run(&commands::yum_install(KATELLO_AGENT))?;
        self.ensure_package(KATELLO_AGENT)
    }

    /// Install the consumer certificate rpm published by `server_hostname`.
    pub fn install_katello_cert(&self, server_hostname: &str) -> Result<(), VmError> {
        let url = commands::katello_ca_url(server_hostname);
        info!(hostname = %self.display_name(), url = %url, "Installing katello-ca consumer rpm");

        let result = self.run(&commands::upgrade_rpm_from_url(&url))?;
        if !result.success() {
            return Err(VmError::CertInstall {
                url,
                hostname: self.display_name(),
                stderr: result.stderr.trim().to_string(),
            });
        }

        self.ensure_package(&commands::katello_ca_package(server_hostname))
    }

    /// Register as a content host. The raw result is returned as is: what
    /// counts as a successful registration depends on the caller.
    pub fn register_contenthost(
        &self,
        activation_key: &str,
        org: &str,
    ) -> Result<CommandResult, VmError> {
        info!(
            hostname = %self.display_name(),
            activation_key,
            org,
            "Registering content host"
        );
        self.run(&commands::register(activation_key, org))
    }

    /// Whether subscription-manager reports a consumer identity.
    pub fn is_subscribed(&self) -> Result<bool, VmError> {
        Ok(self.run(&commands::subscription_identity())?.success())
    }
}
