//! The generic half-duplex component contracts (§4.2, §4.3) that every
//! concrete service/connection in [`crate::services`] is built from.

pub mod hooks;
pub mod inbound;
pub mod outbound;

pub use hooks::{ComponentHooks, DefaultHooks};
pub use inbound::ComponentInbound;
pub use outbound::ComponentOutbound;

use crate::domain_types::ComponentName;

/// The external-facing socket a component owns: either one-way (Pull or
/// Push, no reply expected), duplex (Reply/Request, a reply is always
/// expected once scatter finishes), or an HTTP worker pool.
pub enum ExternalSocket {
    /// A one-way receiving socket (PullService, WorkerPullService, ...).
    Pull(crossbeam::channel::Receiver<crate::transport::Frame>),
    /// A one-way sending socket (PushConnection, WorkerPushService, ...).
    Push(crossbeam::channel::Sender<crate::transport::Frame>),
    /// A duplex request/reply socket (RepService/RepConnection).
    Duplex(crate::transport::DuplexEndpoint),
    /// A bounded pool of blocking HTTP POST calls (`HttpConnection`, §4.4).
    Http(HttpTarget),
}

/// Configuration for an `HttpConnection`: the endpoint POSTed to and the
/// size of the worker pool dispatching those calls.
#[derive(Debug, Clone)]
pub struct HttpTarget {
    /// The URL every scattered sub-payload is POSTed to.
    pub url: String,
    /// Number of concurrent blocking HTTP workers.
    pub workers: usize,
}

impl HttpTarget {
    /// Builds an HTTP target with the given worker pool size.
    #[must_use]
    pub fn new(url: impl Into<String>, workers: usize) -> Self {
        Self {
            url: url.into(),
            workers: workers.max(1),
        }
    }
}

/// The `{socket_kind, bind, expects_reply, palm}` configuration record
/// that replaces the original's per-socket-type subclasses (§9).
#[derive(Debug, Clone)]
pub struct ComponentConfig {
    /// This component's identity, used as router-frame peer identity and
    /// in logging.
    pub name: ComponentName,
    /// Whether this component parses/produces `PalmMessage` framing
    /// (§3, §4.2 "palm mode") rather than treating payloads as opaque
    /// bytes.
    pub palm: bool,
    /// Whether the external socket expects a reply once the scatter loop
    /// for one received message finishes.
    pub expects_reply: bool,
    /// Non-palm components normally mint a fresh broker key per message
    /// (ingress) or strip the key down to the bare payload (egress),
    /// since a one-hop pipe has no need to correlate further. The
    /// worker-fleet leg is two hops (ingress stashes under a key at
    /// `Pull`, egress must splice under that *same* key at `Push`, with
    /// a worker round trip in between) so `WorkerPushService`/
    /// `WorkerPullService` set this to carry the `BrokerMessage`'s key
    /// across the external wire unchanged instead of minting/stripping
    /// it, letting the worker echo it straight back.
    pub preserve_key: bool,
}

impl ComponentConfig {
    /// Builds a config. `palm`/`expects_reply`/`preserve_key` default to
    /// `false`; concrete constructors in [`crate::services`] set them
    /// explicitly.
    #[must_use]
    pub fn new(name: ComponentName) -> Self {
        Self {
            name,
            palm: false,
            expects_reply: false,
            preserve_key: false,
        }
    }

    /// Sets `palm` mode.
    #[must_use]
    pub fn with_palm(mut self, palm: bool) -> Self {
        self.palm = palm;
        self
    }

    /// Sets `expects_reply`.
    #[must_use]
    pub fn with_expects_reply(mut self, expects_reply: bool) -> Self {
        self.expects_reply = expects_reply;
        self
    }

    /// Sets `preserve_key`.
    #[must_use]
    pub fn with_preserve_key(mut self, preserve_key: bool) -> Self {
        self.preserve_key = preserve_key;
        self
    }
}
