//! Dual-stack orchestrator and the seed handoff queue.
//!
//! Architecture:
//! 1. One [`ProtocolListener`] per family runs on its own thread
//! 2. Both push seeds into a single rendezvous channel
//! 3. The orchestrator joins both threads
//! 4. Only then does it drop the last sender, closing the queue
//!
//! Listeners never own the last sender, so the queue cannot close while a
//! producer is still mid-loop and no send can happen after close.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

use crate::endpoint::{EndpointOpener, RawSocketOpener};
use crate::error::{FatalHandler, exit_on_release_failure};
use crate::family::ProtocolFamily;
use crate::listener::{ListenerConfig, ProtocolListener, Stopped};
use crate::platform::HostPlatform;
use crate::seed::Seed;

/// Consumer side of the handoff queue. Iterating it ends when the queue closes.
pub type SeedReceiver = Receiver<Seed>;

/// Final state of one listener, recorded after both have stopped.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerOutcome {
    pub family: ProtocolFamily,
    pub seeds_delivered: u64,
    /// Terminal cause, rendered for logging/reporting.
    pub error: String,
}

/// Summary returned once the queue has been closed.
#[derive(Debug, Clone, Serialize)]
pub struct DualStackReport {
    pub listeners: Vec<ListenerOutcome>,
}

impl DualStackReport {
    pub fn total_seeds(&self) -> u64 {
        self.listeners.iter().map(|l| l.seeds_delivered).sum()
    }

    pub fn outcome(&self, family: ProtocolFamily) -> Option<&ListenerOutcome> {
        self.listeners.iter().find(|l| l.family == family)
    }
}

/// ICMP seed server listening on both IPv4 and IPv6.
///
/// Raw sockets need root (or `CAP_NET_RAW`). Unprivileged ping sockets
/// (`net.ipv4.ping_group_range`) are not used.
pub struct IcmpServer {
    seeds: Sender<Seed>,
    opener: Arc<dyn EndpointOpener>,
    platform: HostPlatform,
    fatal: FatalHandler,
}

impl IcmpServer {
    /// Create a server and the receiving end of its seed queue.
    ///
    /// Start draining the receiver *before* calling [`run_dual_stack`]:
    /// every push blocks until the consumer takes the seed, so without a
    /// consumer the first inbound message deadlocks the listener.
    ///
    /// [`run_dual_stack`]: IcmpServer::run_dual_stack
    pub fn new() -> (Self, SeedReceiver) {
        let (seeds, receiver) = crossbeam_channel::bounded(0);
        let server = Self {
            seeds,
            opener: Arc::new(RawSocketOpener),
            platform: HostPlatform::current(),
            fatal: exit_on_release_failure(),
        };
        (server, receiver)
    }

    /// Replace the raw-socket opener.
    pub fn with_opener(mut self, opener: impl EndpointOpener + 'static) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    /// Override the detected host platform.
    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Replace the handler for unrecoverable release failures.
    pub fn with_fatal_handler(mut self, fatal: FatalHandler) -> Self {
        self.fatal = fatal;
        self
    }

    /// The listener this server would run for `family`.
    pub fn listener(&self, family: ProtocolFamily) -> ProtocolListener {
        ProtocolListener::new(
            ListenerConfig::wildcard(family),
            self.platform.clone(),
            Arc::clone(&self.opener),
            Arc::clone(&self.fatal),
        )
    }

    /// Listen on ICMPv4 and ICMPv6 in parallel until both stop, then close
    /// the seed queue.
    ///
    /// A failing family is logged as a warning and does not affect the other.
    pub fn run_dual_stack(self) -> DualStackReport {
        let listeners = ProtocolFamily::ALL.map(|family| self.listener(family));
        let Self { seeds, .. } = self;

        let stopped: Vec<Stopped> = std::thread::scope(|s| {
            let handles: Vec<_> = listeners
                .iter()
                .map(|listener| {
                    let tx = seeds.clone();
                    (listener.family(), s.spawn(move || listener.listen(tx)))
                })
                .collect();

            handles
                .into_iter()
                .filter_map(|(family, handle)| match handle.join() {
                    Ok(stopped) => Some(stopped),
                    Err(_) => {
                        log::warn!("{family} listener thread panicked");
                        None
                    }
                })
                .collect()
        });

        // Both listener threads have been joined: no sender clone is alive
        // except this one.
        drop(seeds);
        log::info!("both ICMP listeners stopped, seed queue closed");

        let listeners = ProtocolFamily::ALL
            .into_iter()
            .map(|family| match stopped.iter().find(|s| s.family == family) {
                Some(s) => {
                    log::warn!(
                        "{family} listener stopped after {} seed(s): {}",
                        s.seeds_delivered,
                        s.cause
                    );
                    ListenerOutcome {
                        family,
                        seeds_delivered: s.seeds_delivered,
                        error: s.cause.to_string(),
                    }
                }
                None => ListenerOutcome {
                    family,
                    seeds_delivered: 0,
                    error: "listener thread panicked".to_string(),
                },
            })
            .collect();

        DualStackReport { listeners }
    }
}
