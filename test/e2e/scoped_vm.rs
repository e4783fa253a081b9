//! End-to-end test against a real provisioning server.
//!
//! Creates a guest with snap-guest, runs a command on it over SSH and tears it
//! down again. Ignored by default: it needs a provisioning server with the
//! base images, snap-guest and libvirt in place, plus SSH access to it and to
//! the guests it creates.
//!
//! ## Running
//!
//! ```bash
//! SNAPVM_PROVISIONING_SERVER=virt.example.com \
//!   cargo test -p snapvm-e2e --test scoped_vm -- --ignored
//! ```
//!
//! Optional: `SNAPVM_CONFIG` (settings file), `SNAPVM_E2E_DISTRO` (default
//! rhel71), `SNAPVM_SERVER_HOSTNAME` to also exercise the certificate install.

use std::path::PathBuf;

use snapvm_remote::SshRunner;
use snapvm_vm::{Settings, VirtualMachine, VmError};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_test_writer()
        .try_init();
}

fn settings() -> Settings {
    let path = std::env::var("SNAPVM_CONFIG").ok().map(PathBuf::from);
    Settings::load(path.as_deref()).expect("settings should load")
}

#[test]
#[ignore = "needs a provisioning server"]
fn test_create_run_destroy() {
    init_tracing();
    let settings = settings();
    let distro = std::env::var("SNAPVM_E2E_DISTRO").unwrap_or_else(|_| "rhel71".to_string());

    let mut vm = VirtualMachine::builder(SshRunner::new(settings.ssh.clone()))
        .distro(distro)
        .build(&settings.clients)
        .expect("valid configuration");

    vm.create().expect("create");
    assert!(vm.hostname().is_some_and(|h| !h.is_empty()));
    assert!(vm.ip_addr().is_some());

    let result = vm.run("echo ok").expect("run");
    assert_eq!(result.return_code, 0);
    assert!(result.stdout_text().contains("ok"));

    vm.destroy();
    assert!(vm.is_destroyed());
}

#[test]
#[ignore = "needs a provisioning server"]
fn test_scoped_bootstrap() {
    init_tracing();
    let settings = settings();

    let hostname = VirtualMachine::builder(SshRunner::new(settings.ssh.clone()))
        .build(&settings.clients)
        .expect("valid configuration")
        .with(|vm| {
            if let Some(server) = settings.server.hostname.as_deref() {
                vm.install_katello_cert(server)?;
            }
            let uname = vm.run("uname -r")?;
            assert_eq!(uname.return_code, 0);
            Ok::<_, VmError>(vm.hostname().map(str::to_string))
        })
        .expect("scoped run");

    assert!(hostname.is_some());
}
