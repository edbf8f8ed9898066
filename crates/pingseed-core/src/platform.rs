//! Host platform detection and the raw-socket capability guard.
//!
//! Listening for ICMP on raw sockets needs kernel support that we only rely
//! on for Linux and macOS. The check happens once, at listener start, and
//! produces a typed error instead of failing somewhere inside socket setup.

use serde::Serialize;

use crate::error::ListenError;

/// Host operating system as far as raw ICMP listening is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostPlatform {
    Linux,
    MacOS,
    /// Anything else, carrying the OS name reported by the toolchain.
    Other(String),
}

impl HostPlatform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Classify an OS name as reported by `std::env::consts::OS`.
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "macos" => Self::MacOS,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether raw ICMP listening is supported here.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Linux | Self::MacOS)
    }

    /// Guard clause run before any socket is opened.
    pub fn ensure_supported(&self) -> Result<(), ListenError> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(ListenError::PlatformUnsupported {
                os: self.to_string(),
            })
        }
    }
}

impl std::fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::MacOS => write!(f, "macos"),
            Self::Other(os) => write!(f, "{os}"),
        }
    }
}

/// Platform information.
pub fn platform_info() -> PlatformInfo {
    PlatformInfo {
        system: std::env::consts::OS.to_string(),
        machine: std::env::consts::ARCH.to_string(),
        family: std::env::consts::FAMILY.to_string(),
        supported: HostPlatform::current().is_supported(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformInfo {
    pub system: String,
    pub machine: String,
    pub family: String,
    pub supported: bool,
}
