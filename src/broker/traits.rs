//! Supporting types for the broker's routing table and tap wiring.

use crossbeam::channel::Sender;

use crate::domain_types::ComponentName;
use crate::wire::TapTag;

/// An inbound registration: messages arriving from `name` are destined
/// for `route` (defaulting to `name` itself, the self-reply case).
#[derive(Debug, Clone)]
pub struct InboundRoute {
    /// The outbound name messages from this peer are routed to.
    pub route: ComponentName,
    /// Free-form label used in broker logging, mirroring the original's
    /// `log=` constructor argument.
    pub log: String,
}

/// An outbound registration: `name` may receive routed messages.
#[derive(Debug, Clone)]
pub struct OutboundRoute {
    /// Free-form label used in broker logging.
    pub log: String,
}

/// The concrete tee the `Master` assembly wires between the broker's
/// worker-facing routes and the [`crate::resilience::ResilienceService`]
/// ("tap port"). A "to" event fires whenever the broker dispatches a payload to
/// `to_route` (immediately or out of the buffer); a "from" event fires
/// whenever a frame arrives from `from_route`.
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// Outbound route name to tee dispatches to (typically the worker
    /// push service).
    pub to_route: ComponentName,
    /// Inbound route name to tee arrivals from (typically the worker pull
    /// service).
    pub from_route: ComponentName,
    /// Where tapped `(tag, serialized BrokerMessage)` pairs are sent.
    pub sink: Sender<(TapTag, Vec<u8>)>,
}
