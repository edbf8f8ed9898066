//! IP protocol families and their ICMP variants.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::Serialize;

/// One of the two protocol families the daemon listens on.
///
/// Each family has its own control-message protocol number and its own
/// wildcard bind address, and gets its own listener instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProtocolFamily {
    /// ICMP over IPv4 (IP protocol 1).
    #[serde(rename = "ipv4")]
    V4,
    /// ICMPv6 (IP protocol 58).
    #[serde(rename = "ipv6")]
    V6,
}

impl ProtocolFamily {
    /// Both families, in the order the orchestrator starts them.
    pub const ALL: [ProtocolFamily; 2] = [ProtocolFamily::V4, ProtocolFamily::V6];

    /// IANA protocol number of the control-message protocol for this family.
    pub fn protocol_number(self) -> i32 {
        match self {
            Self::V4 => 1,
            Self::V6 => 58,
        }
    }

    /// The "any" address for this family (`0.0.0.0` or `::`).
    pub fn wildcard(self) -> IpAddr {
        match self {
            Self::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            Self::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    /// Whether `addr` belongs to this family.
    pub fn matches(self, addr: &IpAddr) -> bool {
        matches!(
            (self, addr),
            (Self::V4, IpAddr::V4(_)) | (Self::V6, IpAddr::V6(_))
        )
    }
}

impl std::fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4 => write!(f, "ipv4"),
            Self::V6 => write!(f, "ipv6"),
        }
    }
}
