//! Shell command templates.
//!
//! These strings are the contract with snap-guest, virsh, rpm and
//! subscription-manager on the remote side; keep them argument-compatible
//! with those tools.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;

/// Management agent package.
pub const KATELLO_AGENT: &str = "katello-agent";

/// Clone a base image and boot it as a new libvirt domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapGuest<'a> {
    pub source_image: String,
    pub target: &'a str,
    pub ram_mb: u32,
    pub cpu: u32,
    pub bridge: &'a str,
    pub image_dir: Option<&'a str>,
}

impl fmt::Display for SnapGuest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snap-guest -b {} -t {} -m {} -c {} -n bridge={} -f",
            self.source_image, self.target, self.ram_mb, self.cpu, self.bridge
        )?;
        if let Some(dir) = self.image_dir {
            write!(f, " -p {dir}")?;
        }
        Ok(())
    }
}

// Provisioning host side.

pub fn reachability_probe(target: &str) -> String {
    format!("ping -c 1 {target}.local")
}

pub fn domain_stop(name: &str) -> String {
    format!("virsh destroy {name}")
}

pub fn domain_undefine(name: &str) -> String {
    format!("virsh undefine {name}")
}

pub fn remove_image(image_dir: &str, name: &str) -> String {
    let path = Path::new(image_dir).join(format!("{name}.img"));
    format!("rm {}", path.display())
}

/// Address between the first pair of parentheses in the probe output, as in
/// `PING guest-x.local (192.168.100.7) 56(84) bytes of data.`
pub fn parse_probe_address(stdout: &[String]) -> Option<IpAddr> {
    let joined = stdout.concat();
    let (_, rest) = joined.split_once('(')?;
    let (addr, _) = rest.split_once(')')?;
    addr.trim().parse().ok()
}

// Guest side.

pub fn enable_repo(repo: &str) -> String {
    format!("subscription-manager repos --enable {repo}")
}

pub fn fetch_rpm(repo_url: &str, package: &str) -> String {
    format!("wget -nd -r -l1 --no-parent -A '{package}.rpm' {repo_url}")
}

pub fn install_local_rpm(package: &str) -> String {
    format!("rpm -i {package}.rpm")
}

pub fn query_package(package: &str) -> String {
    format!("rpm -q {package}")
}

pub fn yum_install(package: &str) -> String {
    format!("yum install -y {package}")
}

pub fn upgrade_rpm_from_url(url: &str) -> String {
    format!("rpm -Uvh {url}")
}

/// Consumer certificate rpm published by a management server.
pub fn katello_ca_url(server: &str) -> String {
    format!("http://{server}/pub/katello-ca-consumer-latest.noarch.rpm")
}

/// Package name the consumer certificate rpm installs as.
pub fn katello_ca_package(server: &str) -> String {
    format!("katello-ca-consumer-{server}")
}

pub fn register(activation_key: &str, org: &str) -> String {
    format!("subscription-manager register --activationkey {activation_key} --org {org} --force")
}

pub fn subscription_identity() -> String {
    "subscription-manager identity".to_string()
}
