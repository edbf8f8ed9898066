//! Protocol listener: one raw endpoint, one family, one seed per message.
//!
//! A listener moves from running to stopped exactly once. It stops when the
//! platform is unsupported, the endpoint cannot be opened, a read fails, or
//! the seed consumer has gone away. There is no retry.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::SystemTime;

use crossbeam_channel::Sender;

use crate::endpoint::{EndpointOpener, IcmpEndpoint, PeerAddress};
use crate::error::{FatalHandler, ListenError, ReleaseError};
use crate::family::ProtocolFamily;
use crate::platform::HostPlatform;
use crate::seed::{Seed, derive_seed};

/// Where a listener binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerConfig {
    pub family: ProtocolFamily,
    pub bind_addr: IpAddr,
}

impl ListenerConfig {
    /// Bind the "any" address of `family`.
    pub fn wildcard(family: ProtocolFamily) -> Self {
        Self {
            family,
            bind_addr: family.wildcard(),
        }
    }
}

/// Why and when a listener stopped.
#[derive(Debug)]
pub struct Stopped {
    pub family: ProtocolFamily,
    /// Seeds handed to the consumer before stopping.
    pub seeds_delivered: u64,
    pub cause: ListenError,
}

/// Listens on one raw endpoint and feeds derived seeds into the handoff queue.
pub struct ProtocolListener {
    config: ListenerConfig,
    platform: HostPlatform,
    opener: Arc<dyn EndpointOpener>,
    fatal: FatalHandler,
}

impl ProtocolListener {
    pub fn new(
        config: ListenerConfig,
        platform: HostPlatform,
        opener: Arc<dyn EndpointOpener>,
        fatal: FatalHandler,
    ) -> Self {
        Self {
            config,
            platform,
            opener,
            fatal,
        }
    }

    pub fn family(&self) -> ProtocolFamily {
        self.config.family
    }

    /// Run until the listener stops.
    ///
    /// Each push onto `seeds` blocks until the consumer takes the seed, so a
    /// slow consumer throttles this family. The endpoint is released on every
    /// exit path; a failed release goes to the fatal handler.
    pub fn listen(&self, seeds: Sender<Seed>) -> Stopped {
        let family = self.config.family;
        let mut seeds_delivered = 0u64;
        let cause = self.run(&seeds, &mut seeds_delivered);
        Stopped {
            family,
            seeds_delivered,
            cause,
        }
    }

    /// Check that this listener could start: platform guard, then open and
    /// immediately release the endpoint.
    pub fn probe(&self) -> Result<(), ListenError> {
        let family = self.config.family;
        self.platform.ensure_supported()?;
        let endpoint = self
            .opener
            .open(family, self.config.bind_addr)
            .map_err(|source| ListenError::Bind { family, source })?;
        drop(EndpointGuard::new(endpoint, family, Arc::clone(&self.fatal)));
        Ok(())
    }

    fn run(&self, seeds: &Sender<Seed>, delivered: &mut u64) -> ListenError {
        let family = self.config.family;
        if let Err(e) = self.platform.ensure_supported() {
            return e;
        }

        let endpoint = match self.opener.open(family, self.config.bind_addr) {
            Ok(endpoint) => endpoint,
            Err(source) => return ListenError::Bind { family, source },
        };
        let mut endpoint = EndpointGuard::new(endpoint, family, Arc::clone(&self.fatal));
        log::info!(
            "listening for {family} control messages on {}",
            self.config.bind_addr
        );

        loop {
            let peer = match endpoint.recv_peer() {
                Ok(peer) => peer,
                Err(source) => return ListenError::Read { family, source },
            };
            let seed = derive_seed(SystemTime::now(), &peer);
            if seeds.send(seed).is_err() {
                return ListenError::ConsumerDisconnected { family };
            }
            *delivered += 1;
        }
    }
}

/// Owns an open endpoint and releases it when dropped.
struct EndpointGuard {
    endpoint: Option<Box<dyn IcmpEndpoint>>,
    family: ProtocolFamily,
    fatal: FatalHandler,
}

impl EndpointGuard {
    fn new(endpoint: Box<dyn IcmpEndpoint>, family: ProtocolFamily, fatal: FatalHandler) -> Self {
        Self {
            endpoint: Some(endpoint),
            family,
            fatal,
        }
    }

    fn recv_peer(&mut self) -> std::io::Result<PeerAddress> {
        self.endpoint
            .as_mut()
            .expect("endpoint is only taken when the guard drops")
            .recv_peer()
    }
}

impl Drop for EndpointGuard {
    fn drop(&mut self) {
        let Some(endpoint) = self.endpoint.take() else {
            return;
        };
        if let Err(source) = endpoint.close() {
            (self.fatal)(&ReleaseError {
                family: self.family,
                source,
            });
        }
    }
}
