//! Settings and value resolution.
//!
//! Settings come from a TOML file with environment overrides on top. Nothing
//! here is global: callers load a [`Settings`] once and pass the relevant
//! section to whatever needs it. Per-machine values resolve in the order
//! explicit argument, then settings, then a default or a hard error.
//!
//! ```toml
//! [clients]
//! provisioning_server = "virt.example.com"
//! image_dir = "/var/lib/libvirt/images/"
//!
//! [server]
//! hostname = "satellite.example.com"
//!
//! [ssh]
//! identity_file = "/home/ci/.ssh/id_rsa"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use snapvm_remote::SshOptions;
use tracing::debug;

use crate::ConfigError;

/// Settings file name inside the config directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Where libvirt keeps images unless told otherwise.
pub const DEFAULT_IMAGE_DIR: &str = "/var/lib/libvirt/images/";

/// Host bridge guests attach to.
pub const DEFAULT_BRIDGE: &str = "br0";

/// Seconds to let a freshly cloned guest boot before probing it.
pub const DEFAULT_BOOT_SETTLE_SECS: u64 = 60;

pub const ENV_PROVISIONING_SERVER: &str = "SNAPVM_PROVISIONING_SERVER";
pub const ENV_IMAGE_DIR: &str = "SNAPVM_IMAGE_DIR";
pub const ENV_SERVER_HOSTNAME: &str = "SNAPVM_SERVER_HOSTNAME";
pub const ENV_BOOT_SETTLE_SECS: &str = "SNAPVM_BOOT_SETTLE_SECS";

/// All snapvm settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub clients: ClientSettings,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub ssh: SshOptions,
}

/// Provisioning defaults for client machines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Host running libvirt and snap-guest.
    #[serde(default)]
    pub provisioning_server: Option<String>,

    /// Image directory on the provisioning server.
    #[serde(default)]
    pub image_dir: Option<String>,

    #[serde(default = "default_bridge")]
    pub bridge: String,

    #[serde(default = "default_boot_settle_secs")]
    pub boot_settle_secs: u64,
}

fn default_bridge() -> String {
    DEFAULT_BRIDGE.to_string()
}

fn default_boot_settle_secs() -> u64 {
    DEFAULT_BOOT_SETTLE_SECS
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            provisioning_server: None,
            image_dir: None,
            bridge: default_bridge(),
            boot_settle_secs: default_boot_settle_secs(),
        }
    }
}

impl ClientSettings {
    pub fn boot_settle(&self) -> Duration {
        Duration::from_secs(self.boot_settle_secs)
    }
}

/// The management server guests register against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub hostname: Option<String>,
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("org", "snapvm", "snapvm")
            .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load settings and apply environment overrides.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    debug!(path = %path.display(), "No settings file, using defaults");
                    Self::default()
                }
            }
        };

        settings.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a settings file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let settings = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(server) = get(ENV_PROVISIONING_SERVER) {
            self.clients.provisioning_server = Some(server);
        }
        if let Some(dir) = get(ENV_IMAGE_DIR) {
            self.clients.image_dir = Some(dir);
        }
        if let Some(hostname) = get(ENV_SERVER_HOSTNAME) {
            self.server.hostname = Some(hostname);
        }
        if let Some(secs) = get(ENV_BOOT_SETTLE_SECS) {
            self.clients.boot_settle_secs =
                secs.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: ENV_BOOT_SETTLE_SECS.to_string(),
                    message: format!("expected a number of seconds, got {secs:?}"),
                })?;
        }

        Ok(self)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Provisioning server for one machine: explicit value, else settings.
pub fn resolve_provisioning_server(
    explicit: Option<&str>,
    settings: &ClientSettings,
) -> Result<String, ConfigError> {
    non_empty(explicit)
        .or(non_empty(settings.provisioning_server.as_deref()))
        .map(str::to_string)
        .ok_or(ConfigError::MissingProvisioningServer)
}

/// Image directory for one machine: explicit value, else settings, else
/// [`DEFAULT_IMAGE_DIR`].
pub fn resolve_image_dir(explicit: Option<&str>, settings: &ClientSettings) -> String {
    non_empty(explicit)
        .or(non_empty(settings.image_dir.as_deref()))
        .unwrap_or(DEFAULT_IMAGE_DIR)
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.clients.bridge, "br0");
        assert_eq!(settings.clients.boot_settle(), Duration::from_secs(60));
        assert!(settings.clients.provisioning_server.is_none());
        assert!(settings.server.hostname.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"
            [clients]
            provisioning_server = "virt.example.com"
            boot_settle_secs = 5

            [ssh]
            user = "cloud-user"
            "#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(
            settings.clients.provisioning_server.as_deref(),
            Some("virt.example.com")
        );
        assert_eq!(settings.clients.boot_settle_secs, 5);
        assert_eq!(settings.clients.bridge, "br0");
        assert_eq!(settings.ssh.user, "cloud-user");
        assert_eq!(settings.ssh.port, 22);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[clients\nprovisioning_server = ").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let settings = Settings::default()
            .with_overrides(env(&[
                (ENV_PROVISIONING_SERVER, "virt2.example.com"),
                (ENV_IMAGE_DIR, "/srv/images"),
                (ENV_SERVER_HOSTNAME, "sat.example.com"),
                (ENV_BOOT_SETTLE_SECS, "0"),
            ]))
            .unwrap();

        assert_eq!(
            settings.clients.provisioning_server.as_deref(),
            Some("virt2.example.com")
        );
        assert_eq!(settings.clients.image_dir.as_deref(), Some("/srv/images"));
        assert_eq!(settings.server.hostname.as_deref(), Some("sat.example.com"));
        assert_eq!(settings.clients.boot_settle_secs, 0);
    }

    #[test]
    fn test_empty_env_is_ignored() {
        let mut base = Settings::default();
        base.clients.provisioning_server = Some("virt.example.com".to_string());

        let settings = base
            .with_overrides(env(&[(ENV_PROVISIONING_SERVER, "  ")]))
            .unwrap();
        assert_eq!(
            settings.clients.provisioning_server.as_deref(),
            Some("virt.example.com")
        );
    }

    #[test]
    fn test_bad_settle_env() {
        let err = Settings::default()
            .with_overrides(env(&[(ENV_BOOT_SETTLE_SECS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_BOOT_SETTLE_SECS));
    }

    #[test]
    fn test_resolve_provisioning_server_order() {
        let mut clients = ClientSettings::default();
        assert!(matches!(
            resolve_provisioning_server(None, &clients),
            Err(ConfigError::MissingProvisioningServer)
        ));

        clients.provisioning_server = Some("from-settings".to_string());
        assert_eq!(
            resolve_provisioning_server(None, &clients).unwrap(),
            "from-settings"
        );
        assert_eq!(
            resolve_provisioning_server(Some("explicit"), &clients).unwrap(),
            "explicit"
        );
        assert_eq!(
            resolve_provisioning_server(Some(""), &clients).unwrap(),
            "from-settings"
        );
    }

    #[test]
    fn test_resolve_image_dir_order() {
        let mut clients = ClientSettings::default();
        assert_eq!(resolve_image_dir(None, &clients), DEFAULT_IMAGE_DIR);

        clients.image_dir = Some("/srv/images".to_string());
        assert_eq!(resolve_image_dir(None, &clients), "/srv/images");
        assert_eq!(resolve_image_dir(Some("/tmp/img"), &clients), "/tmp/img");
    }
}
