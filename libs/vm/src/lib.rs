//! snapvm virtual machine management.
//!
//! Disposable client machines for black-box tests, cloned from base images
//! with `snap-guest` on a remote provisioning server and removed with `virsh`
//! when the test is done. All remote work goes through a
//! [`CommandRunner`](snapvm_remote::CommandRunner).
//!
//! ```ignore
//! let settings = Settings::load(None)?;
//! let runner = SshRunner::new(settings.ssh.clone());
//!
//! VirtualMachine::builder(runner)
//!     .distro("rhel71")
//!     .build(&settings.clients)?
//!     .with(|vm| {
//!         vm.install_katello_cert("satellite.example.com")?;
//!         let result = vm.register_contenthost("ak-1", "Default_Organization")?;
//!         assert_eq!(result.return_code, 0);
//!         Ok::<_, VmError>(())
//!     })?;
//! ```
//!
//! ## Modules
//!
//! - `machine`: [`VirtualMachine`] and its create/run/destroy lifecycle
//! - `scoped`: [`ScopedVm`], destroy-on-drop guard
//! - `bootstrap`: repository, agent, certificate and registration helpers
//! - `config`: [`Settings`] and explicit resolution of per-machine values
//! - `commands`: the shell command templates sent to remote hosts

mod bootstrap;
pub mod commands;
pub mod config;
mod distro;
mod error;
mod machine;
mod scoped;

pub use config::{ClientSettings, ServerSettings, Settings};
pub use distro::Distro;
pub use error::{ConfigError, VmError};
pub use machine::{Identity, VirtualMachine, VirtualMachineBuilder};
pub use scoped::ScopedVm;
