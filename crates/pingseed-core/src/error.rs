//! Error types for the ICMP listeners.
//!
//! Listener-level failures ([`ListenError`]) stop one family and are logged by
//! the orchestrator. A failure to release an open endpoint ([`ReleaseError`])
//! is never downgraded: it goes to the orchestrator's fatal handler.

use std::sync::Arc;

use thiserror::Error;

use crate::family::ProtocolFamily;

/// Terminal cause of a single protocol listener stopping.
#[derive(Error, Debug)]
pub enum ListenError {
    /// The host OS cannot listen for raw ICMP. Raised before any socket work.
    #[error("listening for icmp packets is not supported on {os}")]
    PlatformUnsupported { os: String },

    /// The raw endpoint could not be opened (usually missing privilege).
    #[error("{family} listen failed: {source}")]
    Bind {
        family: ProtocolFamily,
        #[source]
        source: std::io::Error,
    },

    /// Receiving the next message failed on an open endpoint.
    #[error("{family} read failed: {source}")]
    Read {
        family: ProtocolFamily,
        #[source]
        source: std::io::Error,
    },

    /// The seed receiver was dropped; nobody can drain the queue any more.
    #[error("{family} seed consumer disconnected")]
    ConsumerDisconnected { family: ProtocolFamily },
}

/// Releasing an already-open raw endpoint failed.
#[derive(Error, Debug)]
#[error("closing {family} endpoint failed: {source}")]
pub struct ReleaseError {
    pub family: ProtocolFamily,
    #[source]
    pub source: std::io::Error,
}

/// Receives unrecoverable release failures. The default terminates the process.
pub type FatalHandler = Arc<dyn Fn(&ReleaseError) + Send + Sync>;

/// Default fatal policy: log and exit with status 1.
pub fn exit_on_release_failure() -> FatalHandler {
    Arc::new(|err: &ReleaseError| {
        log::error!("{err}");
        std::process::exit(1);
    })
}
