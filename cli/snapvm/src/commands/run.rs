//! `snapvm run`: create, bootstrap, run, destroy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;
use snapvm_id::RunId;
use snapvm_remote::{CommandResult, CommandRunner};
use snapvm_vm::{Identity, VirtualMachine};
use tracing::{info, info_span, warn};

use crate::output::{print_info, print_json, print_success, OutputFormat};

use super::exec::print_result;
use super::CommandContext;

/// Create a VM, bootstrap it, run a command on it, destroy it.
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Base image distro (see `snapvm distros`). Defaults to the newest.
    #[arg(long)]
    distro: Option<String>,

    /// Virtual CPUs.
    #[arg(long, default_value_t = 1)]
    cpu: u32,

    /// Memory in MiB.
    #[arg(long, default_value_t = 512)]
    ram: u32,

    /// Provisioning server; overrides settings.
    #[arg(long)]
    provisioning_server: Option<String>,

    /// Image directory on the provisioning server; overrides settings.
    #[arg(long)]
    image_dir: Option<String>,

    /// Management server hostname; overrides [server] hostname.
    #[arg(long)]
    server: Option<String>,

    /// Install the management server's consumer certificate rpm.
    #[arg(long)]
    install_cert: bool,

    /// Register with this activation key (needs --org).
    #[arg(long, requires = "org")]
    activation_key: Option<String>,

    /// Organization to register into (needs --activation-key).
    #[arg(long, requires = "activation_key")]
    org: Option<String>,

    /// Enable a repository after registration. Repeatable.
    #[arg(long = "enable-repo")]
    enable_repo: Vec<String>,

    /// Install katello-agent after enabling repositories.
    #[arg(long)]
    install_agent: bool,

    /// Command to run on the VM; joined with spaces. Omit to only bootstrap.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// What `run` reports once the VM is gone.
#[derive(Debug, Serialize)]
struct RunReport {
    run_id: RunId,
    distro: String,
    identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<CommandResult>,
}

/// Set by the Ctrl+C handler, checked between steps.
///
/// Nothing polls it while `create` is in progress; a Ctrl+C during the boot
/// settle wait or the probe takes effect once the guest is up, and the guest
/// is then destroyed as usual.
#[derive(Debug, Clone, Default)]
struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Install the handler. Once installed, Ctrl+C no longer kills the
    /// process outright; the in-flight ssh client still receives it.
    fn install() -> Self {
        let interrupt = Self::default();
        let flag = Arc::clone(&interrupt.0);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
        interrupt
    }

    fn check(&self) -> Result<()> {
        if self.0.load(Ordering::SeqCst) {
            bail!("Interrupted");
        }
        Ok(())
    }
}

impl RunCommand {
    pub fn run(self, ctx: CommandContext) -> Result<i32> {
        let run_id = RunId::new();
        let _span = info_span!("run", run_id = %run_id).entered();

        let server_hostname = self
            .server
            .clone()
            .or_else(|| ctx.settings.server.hostname.clone());
        if self.install_cert && server_hostname.is_none() {
            bail!("--install-cert needs a management server: pass --server or set [server] hostname");
        }

        let mut builder = VirtualMachine::builder(ctx.runner())
            .cpu(self.cpu)
            .ram_mb(self.ram);
        if let Some(distro) = &self.distro {
            builder = builder.distro(distro.clone());
        }
        if let Some(server) = &self.provisioning_server {
            builder = builder.provisioning_server(server.clone());
        }
        if let Some(dir) = &self.image_dir {
            builder = builder.image_dir(dir.clone());
        }
        let vm = builder.build(&ctx.settings.clients)?;
        let distro = vm.distro().to_string();

        let interrupt = Interrupt::install();
        if ctx.format == OutputFormat::Table {
            print_info(&format!(
                "Creating {} ({}) on {}",
                vm.target_image(),
                distro,
                vm.provisioning_server()
            ));
        }

        let (identity, result) = self.drive(vm, server_hostname.as_deref(), &interrupt)?;

        let code = result.as_ref().map_or(0, |r| r.return_code);
        match ctx.format {
            OutputFormat::Json => print_json(&RunReport {
                run_id,
                distro,
                identity,
                result,
            }),
            OutputFormat::Table => {
                if let Some(result) = &result {
                    print_result(result, ctx.format);
                }
                print_success(&format!(
                    "{} ({}) ran and was destroyed",
                    identity.hostname, identity.ip_addr
                ));
            }
        }

        Ok(code)
    }

    /// Create the guest, bootstrap it, run the command, destroy it.
    fn drive<R: CommandRunner>(
        &self,
        vm: VirtualMachine<R>,
        server_hostname: Option<&str>,
        interrupt: &Interrupt,
    ) -> Result<(Identity, Option<CommandResult>)> {
        interrupt.check()?;

        vm.with(|vm| -> Result<_> {
            interrupt.check()?;
            let identity = vm
                .identity()
                .cloned()
                .context("Virtual machine has no identity after create")?;
            info!(hostname = %identity.hostname, ip_addr = %identity.ip_addr, "Guest is up");

            if let Some(server) = server_hostname.filter(|_| self.install_cert) {
                vm.install_katello_cert(server)?;
                interrupt.check()?;
            }

            if let (Some(key), Some(org)) = (&self.activation_key, &self.org) {
                let registration = vm.register_contenthost(key, org)?;
                if !registration.success() {
                    bail!(
                        "Registration with activation key {key} failed (exit {}): {}",
                        registration.return_code,
                        registration.stderr.trim()
                    );
                }
                interrupt.check()?;
            }

            for repo in &self.enable_repo {
                vm.enable_repo(repo)?;
                interrupt.check()?;
            }

            if self.install_agent {
                vm.install_katello_agent()?;
                interrupt.check()?;
            }

            let result = if self.command.is_empty() {
                None
            } else {
                Some(vm.run(&self.command.join(" "))?)
            };

            Ok((identity, result))
        })
    }
}
