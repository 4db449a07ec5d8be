//! In-process stand-in for the opaque message-queue transport (§6:
//! "URL-like strings selecting a transport ... the core treats them
//! opaquely; only bind-vs-connect discipline is mandated"). This is the
//! one concrete realization the core ships with; nothing in
//! [`crate::broker`] or [`crate::component`] assumes it is the only one.
//!
//! A [`Frame`] is the collapsed form of the three-part router frame in
//! §6 (`peer-identity, empty-delimiter, payload-bytes`) — the empty
//! delimiter is a wire-level artifact with no information content, so it
//! is simply absent here.

use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;

use crate::domain_types::ComponentName;

/// A single frame crossing a socket: the sender's identity plus payload.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Identity of the peer that sent this frame.
    pub peer: ComponentName,
    /// Opaque payload bytes (a serialized `BrokerMessage`, raw bytes, or a
    /// bare control byte like `b"1"`/`b"0"`, depending on socket role).
    pub payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame.
    #[must_use]
    pub fn new(peer: ComponentName, payload: Vec<u8>) -> Self {
        Self { peer, payload }
    }
}

/// One half of a full-duplex connection between a component and its peer
/// (broker, or a request/reply external endpoint). Named policies in
/// [`crate::services`] build one `DuplexEndpoint` per connection and hand
/// it to a [`crate::component`] generic.
#[derive(Debug, Clone)]
pub struct DuplexEndpoint {
    /// Sends frames to the peer.
    pub to_peer: Sender<Frame>,
    /// Receives frames from the peer.
    pub from_peer: Receiver<Frame>,
}

impl DuplexEndpoint {
    /// Builds a complementary pair of duplex endpoints, one for each side
    /// of a connection — this is how a `RepService`/`RepConnection` pair,
    /// or a component's request socket to the broker, comes to exist.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = channel::unbounded();
        let (tx_b, rx_b) = channel::unbounded();
        (
            Self {
                to_peer: tx_a,
                from_peer: rx_b,
            },
            Self {
                to_peer: tx_b,
                from_peer: rx_a,
            },
        )
    }
}

/// A process-local registry of named endpoints, providing the bind/connect
/// discipline §6 mandates without committing to a concrete external
/// transport. First bind or connect on a name creates its mailbox;
/// subsequent calls share it.
#[derive(Debug, Default)]
pub struct Transport {
    mailboxes: DashMap<String, (Sender<Frame>, Receiver<Frame>)>,
    duplex_bound: DashMap<String, DuplexEndpoint>,
    duplex_connect: DashMap<String, DuplexEndpoint>,
}

impl Transport {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mailboxes: DashMap::new(),
            duplex_bound: DashMap::new(),
            duplex_connect: DashMap::new(),
        }
    }

    fn ensure_duplex(&self, endpoint: &str) {
        if self.duplex_bound.contains_key(endpoint) {
            return;
        }
        let (bound, connect) = DuplexEndpoint::pair();
        self.duplex_bound.entry(endpoint.to_string()).or_insert(bound);
        self.duplex_connect.entry(endpoint.to_string()).or_insert(connect);
    }

    /// Binds a duplex (request/reply) socket at `endpoint`, returning the
    /// bound half. The peer reaches it via [`Self::connect_duplex`].
    #[must_use]
    pub fn bind_duplex(&self, endpoint: &str) -> DuplexEndpoint {
        self.ensure_duplex(endpoint);
        self.duplex_bound.get(endpoint).expect("just ensured").clone()
    }

    /// Connects a duplex (request/reply) socket to `endpoint`, returning
    /// the connecting half.
    #[must_use]
    pub fn connect_duplex(&self, endpoint: &str) -> DuplexEndpoint {
        self.ensure_duplex(endpoint);
        self.duplex_connect.get(endpoint).expect("just ensured").clone()
    }

    fn mailbox(&self, endpoint: &str) -> (Sender<Frame>, Receiver<Frame>) {
        self.mailboxes
            .entry(endpoint.to_string())
            .or_insert_with(channel::unbounded)
            .clone()
    }

    /// Binds a PULL-style socket at `endpoint`, returning the receiving
    /// half. Producers reach it via [`Self::connect_push`].
    #[must_use]
    pub fn bind_pull(&self, endpoint: &str) -> Receiver<Frame> {
        self.mailbox(endpoint).1
    }

    /// Connects a PUSH-style socket to `endpoint`, returning the sending
    /// half that delivers into whoever bound it.
    #[must_use]
    pub fn connect_push(&self, endpoint: &str) -> Sender<Frame> {
        self.mailbox(endpoint).0
    }
}
