//! Supported base images.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Base image a guest is cloned from. The provisioning host must carry a
/// `<distro>-base` image for each of these.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Distro {
    Rhel65,
    Rhel66,
    Rhel70,
    /// Newest supported, used when no distro is requested.
    #[default]
    Rhel71,
}

impl Distro {
    /// Every supported distro, oldest first.
    pub const ALL: [Distro; 4] = [
        Distro::Rhel65,
        Distro::Rhel66,
        Distro::Rhel70,
        Distro::Rhel71,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Distro::Rhel65 => "rhel65",
            Distro::Rhel66 => "rhel66",
            Distro::Rhel70 => "rhel70",
            Distro::Rhel71 => "rhel71",
        }
    }

    /// Name of the snap-guest source image.
    pub fn base_image(&self) -> String {
        format!("{}-base", self.as_str())
    }

    /// Comma-separated list of supported names.
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(Distro::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distro {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedDistro {
                distro: s.to_string(),
                supported: Self::supported(),
            })
    }
}
