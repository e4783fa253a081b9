//! Virtual machine lifecycle.
//!
//! A [`VirtualMachine`] owns exactly one libvirt domain and its disk image on
//! the provisioning server, from a successful [`create`](VirtualMachine::create)
//! until [`destroy`](VirtualMachine::destroy). Nothing remote happens at
//! construction time, so bad configuration fails before any side effect.
//!
//! ```text
//! Pending --create()--> Running(identity) --destroy()--> Destroyed
//! ```
//!
//! Call `destroy` (or use [`scoped`](VirtualMachine::scoped)); a machine that
//! is dropped while running leaves its domain behind on the server.

use std::net::IpAddr;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use snapvm_id::GuestId;
use snapvm_remote::{CommandResult, CommandRunner, ExecError};
use tracing::{debug, info, warn};

use crate::commands::{self, SnapGuest};
use crate::config::{resolve_image_dir, resolve_provisioning_server, ClientSettings};
use crate::{ConfigError, Distro, VmError};

/// Who the machine is once it is up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub hostname: String,
    pub ip_addr: IpAddr,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
enum Lifecycle {
    Pending,
    Running(Identity),
    Destroyed,
}

/// Builder for [`VirtualMachine`].
///
/// Unset values resolve against [`ClientSettings`] in
/// [`build`](VirtualMachineBuilder::build).
#[derive(Debug)]
pub struct VirtualMachineBuilder<R> {
    runner: R,
    cpu: u32,
    ram_mb: u32,
    distro: Option<String>,
    provisioning_server: Option<String>,
    image_dir: Option<String>,
    bridge: Option<String>,
    boot_settle: Option<Duration>,
}

impl<R: CommandRunner> VirtualMachineBuilder<R> {
    /// Number of virtual CPUs. Default 1.
    pub fn cpu(mut self, cpu: u32) -> Self {
        self.cpu = cpu;
        self
    }

    /// Memory in MiB. Default 512.
    pub fn ram_mb(mut self, ram_mb: u32) -> Self {
        self.ram_mb = ram_mb;
        self
    }

    /// Base image name, checked in `build`. Default: newest supported.
    pub fn distro(mut self, distro: impl Into<String>) -> Self {
        self.distro = Some(distro.into());
        self
    }

    pub fn provisioning_server(mut self, server: impl Into<String>) -> Self {
        self.provisioning_server = Some(server.into());
        self
    }

    pub fn image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = Some(dir.into());
        self
    }

    pub fn bridge(mut self, bridge: impl Into<String>) -> Self {
        self.bridge = Some(bridge.into());
        self
    }

    /// Wait between snap-guest returning and the first probe.
    pub fn boot_settle(mut self, wait: Duration) -> Self {
        self.boot_settle = Some(wait);
        self
    }

    /// Validate and resolve everything. Performs no remote action.
    pub fn build(self, settings: &ClientSettings) -> Result<VirtualMachine<R>, ConfigError> {
        let distro = match self.distro.as_deref() {
            Some(name) => name.parse::<Distro>()?,
            None => Distro::default(),
        };

        if self.cpu == 0 {
            return Err(ConfigError::InvalidResources(
                "cpu count must be at least 1".to_string(),
            ));
        }
        if self.ram_mb == 0 {
            return Err(ConfigError::InvalidResources(
                "ram must be at least 1 MiB".to_string(),
            ));
        }

        let provisioning_server =
            resolve_provisioning_server(self.provisioning_server.as_deref(), settings)?;
        let image_dir = resolve_image_dir(self.image_dir.as_deref(), settings);

        Ok(VirtualMachine {
            runner: self.runner,
            cpu: self.cpu,
            ram_mb: self.ram_mb,
            distro,
            provisioning_server,
            image_dir,
            bridge: self.bridge.unwrap_or_else(|| settings.bridge.clone()),
            boot_settle: self.boot_settle.unwrap_or_else(|| settings.boot_settle()),
            target: GuestId::new(),
            state: Lifecycle::Pending,
        })
    }
}

/// A disposable client machine on a provisioning server.
#[derive(Debug)]
pub struct VirtualMachine<R> {
    runner: R,
    cpu: u32,
    ram_mb: u32,
    distro: Distro,
    provisioning_server: String,
    image_dir: String,
    bridge: String,
    boot_settle: Duration,
    target: GuestId,
    state: Lifecycle,
}

impl<R: CommandRunner> VirtualMachine<R> {
    /// Start configuring a machine that will run commands through `runner`.
    pub fn builder(runner: R) -> VirtualMachineBuilder<R> {
        VirtualMachineBuilder {
            runner,
            cpu: 1,
            ram_mb: 512,
            distro: None,
            provisioning_server: None,
            image_dir: None,
            bridge: None,
            boot_settle: None,
        }
    }

    pub fn cpu(&self) -> u32 {
        self.cpu
    }

    pub fn ram_mb(&self) -> u32 {
        self.ram_mb
    }

    pub fn distro(&self) -> Distro {
        self.distro
    }

    pub fn provisioning_server(&self) -> &str {
        &self.provisioning_server
    }

    pub fn image_dir(&self) -> &str {
        &self.image_dir
    }

    /// Name the domain and image get on the server. Fixed at construction.
    pub fn target_image(&self) -> GuestId {
        self.target
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Identity, once created and until destroyed.
    pub fn identity(&self) -> Option<&Identity> {
        match &self.state {
            Lifecycle::Running(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn hostname(&self) -> Option<&str> {
        self.identity().map(|i| i.hostname.as_str())
    }

    pub fn ip_addr(&self) -> Option<IpAddr> {
        self.identity().map(|i| i.ip_addr)
    }

    /// Whether a live remote domain is currently owned.
    pub fn is_created(&self) -> bool {
        matches!(self.state, Lifecycle::Running(_))
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, Lifecycle::Destroyed)
    }

    /// The snap-guest invocation `create` runs.
    pub fn provision_command(&self) -> String {
        let target = self.target.to_string();
        SnapGuest {
            source_image: self.distro.base_image(),
            target: &target,
            ram_mb: self.ram_mb,
            cpu: self.cpu,
            bridge: &self.bridge,
            image_dir: Some(&self.image_dir),
        }
        .to_string()
    }

    /// Clone, boot and locate the machine. No-op if already created.
    ///
    /// On error the machine stays uncreated. If snap-guest may have cloned
    /// the guest (its client died mid-run, or the guest booted but could not
    /// be located), the domain is torn down before returning.
    pub fn create(&mut self) -> Result<(), VmError> {
        match self.state {
            Lifecycle::Running(_) => return Ok(()),
            Lifecycle::Destroyed => {
                return Err(VmError::Destroyed {
                    hostname: self.target.to_string(),
                })
            }
            Lifecycle::Pending => {}
        }

        let target = self.target.to_string();
        info!(
            target_image = %target,
            distro = %self.distro,
            provisioning_server = %self.provisioning_server,
            cpu = self.cpu,
            ram_mb = self.ram_mb,
            "Creating virtual machine"
        );

        let result = match self
            .runner
            .run(&self.provisioning_server, &self.provision_command())
        {
            Ok(result) => result,
            Err(e) => {
                // snap-guest may have run on the server before the client
                // died, so only a client that never got there leaves nothing.
                if !matches!(e, ExecError::Spawn { .. } | ExecError::Connection { .. }) {
                    warn!(
                        target_image = %target,
                        error = %e,
                        "Lost snap-guest mid-run, tearing down whatever it created"
                    );
                    self.teardown(&target);
                }
                return Err(VmError::Provisioning(format!(
                    "failed to run snap-guest: {e}"
                )));
            }
        };
        if !result.success() {
            return Err(VmError::Provisioning(format!(
                "failed to run snap-guest: {}",
                result.stderr.trim()
            )));
        }

        if !self.boot_settle.is_zero() {
            debug!(target_image = %target, wait = ?self.boot_settle, "Waiting for guest to boot");
            thread::sleep(self.boot_settle);
        }

        let ip_addr = match self.locate(&target) {
            Ok(ip_addr) => ip_addr,
            Err(e) => {
                warn!(
                    target_image = %target,
                    error = %e,
                    "Guest booted but could not be located, tearing it down"
                );
                self.teardown(&target);
                return Err(e);
            }
        };

        info!(hostname = %target, ip_addr = %ip_addr, "Virtual machine created");
        self.state = Lifecycle::Running(Identity {
            hostname: target,
            ip_addr,
            created_at: Utc::now(),
        });
        Ok(())
    }

    fn locate(&self, target: &str) -> Result<IpAddr, VmError> {
        const NO_ADDRESS: &str = "failed to fetch virtual machine IP address information";

        let result = self
            .runner
            .run(&self.provisioning_server, &commands::reachability_probe(target))
            .map_err(|e| VmError::Provisioning(format!("{NO_ADDRESS}: {e}")))?;
        if !result.success() {
            return Err(VmError::Provisioning(format!(
                "{NO_ADDRESS}: probe exited with status {}",
                result.return_code
            )));
        }

        commands::parse_probe_address(&result.stdout).ok_or_else(|| {
            VmError::Provisioning(format!(
                "{NO_ADDRESS}: no address in probe output {:?}",
                result.stdout_text()
            ))
        })
    }

    /// Stop the domain and delete its image. No-op unless created.
    ///
    /// Every step is attempted; failures are logged and never returned.
    pub fn destroy(&mut self) {
        let Lifecycle::Running(identity) = &self.state else {
            return;
        };
        let hostname = identity.hostname.clone();

        info!(hostname = %hostname, "Destroying virtual machine");
        self.teardown(&hostname);
        self.state = Lifecycle::Destroyed;
    }

    fn teardown(&self, name: &str) {
        let steps = [
            ("stop domain", commands::domain_stop(name)),
            ("undefine domain", commands::domain_undefine(name)),
            ("remove image", commands::remove_image(&self.image_dir, name)),
        ];

        for (step, command) in steps {
            match self.runner.run(&self.provisioning_server, &command) {
                Ok(result) if result.success() => {
                    debug!(hostname = %name, step, "Teardown step done");
                }
                Ok(result) => warn!(
                    hostname = %name,
                    step,
                    return_code = result.return_code,
                    stderr = %result.stderr.trim(),
                    "Teardown step failed"
                ),
                Err(e) => warn!(hostname = %name, step, error = %e, "Teardown step failed"),
            }
        }
    }

    /// Run a shell command on the machine itself.
    pub fn run(&self, command: &str) -> Result<CommandResult, VmError> {
        let Lifecycle::Running(identity) = &self.state else {
            return Err(VmError::NotCreated);
        };

        Ok(self
            .runner
            .run(&identity.ip_addr.to_string(), command)?)
    }
}

impl<R> Drop for VirtualMachine<R> {
    fn drop(&mut self) {
        if let Lifecycle::Running(identity) = &self.state {
            warn!(
                hostname = %identity.hostname,
                provisioning_server = %self.provisioning_server,
                "Virtual machine dropped without destroy; domain and image left on the server"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use snapvm_testing::{exit, ping_reply, ScriptedRunner};

    use super::*;

    fn settings() -> ClientSettings {
        ClientSettings {
            provisioning_server: Some("virt.example.com".to_string()),
            boot_settle_secs: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_builder_defaults() {
        let vm = VirtualMachine::builder(ScriptedRunner::new())
            .build(&settings())
            .unwrap();

        assert_eq!(vm.cpu(), 1);
        assert_eq!(vm.ram_mb(), 512);
        assert_eq!(vm.distro(), Distro::Rhel71);
        assert_eq!(vm.provisioning_server(), "virt.example.com");
        assert_eq!(vm.image_dir(), "/var/lib/libvirt/images/");
        assert!(!vm.is_created());
        assert!(vm.hostname().is_none());
        assert!(vm.ip_addr().is_none());
    }

    #[test]
    fn test_zero_resources_rejected() {
        let err = VirtualMachine::builder(ScriptedRunner::new())
            .cpu(0)
            .build(&settings())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidResources(_)));

        let err = VirtualMachine::builder(ScriptedRunner::new())
            .ram_mb(0)
            .build(&settings())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidResources(_)));
    }

    #[test]
    fn test_provision_command_uses_target() {
        let vm = VirtualMachine::builder(ScriptedRunner::new())
            .distro("rhel66")
            .cpu(2)
            .ram_mb(1024)
            .image_dir("/srv/images")
            .build(&settings())
            .unwrap();

        assert_eq!(
            vm.provision_command(),
            format!(
                "snap-guest -b rhel66-base -t {} -m 1024 -c 2 -n bridge=br0 -f -p /srv/images",
                vm.target_image()
            )
        );
    }

    #[test]
    fn test_unlocatable_guest_is_torn_down() {
        let runner = ScriptedRunner::new();
        runner.on("ping", exit(1, "unknown host"));
        let mut vm = VirtualMachine::builder(runner.clone())
            .build(&settings())
            .unwrap();

        let err = vm.create().unwrap_err();
        assert!(matches!(err, VmError::Provisioning(_)));
        assert!(err.to_string().contains("IP address"));
        assert!(!vm.is_created());

        let target = vm.target_image().to_string();
        assert_eq!(runner.count(&format!("virsh destroy {target}")), 1);
        assert_eq!(runner.count(&format!("virsh undefine {target}")), 1);
        assert_eq!(runner.count("rm "), 1);
    }

    #[test]
    fn test_unparseable_probe_output() {
        let runner = ScriptedRunner::new();
        runner.on("ping", snapvm_testing::ok(&["PING: something odd"]));
        let mut vm = VirtualMachine::builder(runner.clone())
            .build(&settings())
            .unwrap();

        let err = vm.create().unwrap_err();
        assert!(err.to_string().contains("no address in probe output"));
        assert!(!vm.is_created());
    }

    #[test]
    fn test_create_after_destroy_fails() {
        let runner = ScriptedRunner::new();
        let mut vm = VirtualMachine::builder(runner.clone())
            .build(&settings())
            .unwrap();
        let target = vm.target_image().to_string();
        runner.on("ping", ping_reply(&target, "10.1.2.3"));

        vm.create().unwrap();
        vm.destroy();
        assert!(vm.is_destroyed());

        let err = vm.create().unwrap_err();
        assert!(matches!(err, VmError::Destroyed { .. }));
        assert_eq!(runner.count("snap-guest"), 1);
        assert!(matches!(vm.run("true"), Err(VmError::NotCreated)));
    }
}
