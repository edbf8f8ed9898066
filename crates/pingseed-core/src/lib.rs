//! # pingseed-core
//!
//! **Every ping is a seed.**
//!
//! `pingseed-core` listens passively on raw ICMP and ICMPv6 sockets and, for
//! every inbound control message, derives a 64-bit seed from the arrival time
//! and the sender's address. Message payloads are never read.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pingseed_core::IcmpServer;
//!
//! let (server, seeds) = IcmpServer::new();
//!
//! // The consumer must be draining before the server starts.
//! let consumer = std::thread::spawn(move || {
//!     for seed in seeds {
//!         println!("{seed}");
//!     }
//! });
//!
//! // Blocks until both families have stopped, then closes the queue.
//! let report = server.run_dual_stack();
//! println!("{} seeds delivered", report.total_seeds());
//! consumer.join().unwrap();
//! ```
//!
//! ## Architecture
//!
//! Raw socket → Listener (one per family) → handoff queue → consumer
//!
//! Seeds are `nanos_within_second(arrival) - d1 - d2 - ... - dn` where `d1..dn`
//! are the decimal digit runs of the sender address. This is cheap
//! decorrelation, not a cryptographic RNG.

pub mod digits;
pub mod endpoint;
pub mod error;
pub mod family;
pub mod listener;
pub mod platform;
pub mod seed;
pub mod server;

pub use digits::extract_digits;
#[cfg(unix)]
pub use endpoint::RawIcmpSocket;
pub use endpoint::{EndpointOpener, IcmpEndpoint, PeerAddress, RawSocketOpener};
pub use error::{FatalHandler, ListenError, ReleaseError, exit_on_release_failure};
pub use family::ProtocolFamily;
pub use listener::{ListenerConfig, ProtocolListener, Stopped};
pub use platform::{HostPlatform, PlatformInfo, platform_info};
pub use seed::{Seed, derive_seed, seed_from_base, subsec_nanos};
pub use server::{DualStackReport, IcmpServer, ListenerOutcome, SeedReceiver};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
