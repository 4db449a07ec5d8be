//! Crate-wide structured errors, one `thiserror` enum per subsystem,
//! composed the way the router's `traits.rs` layers
//! `RouterError`/`DeliveryError`/`ConversationError`/`RegistryError`.
//!
//! Per spec §7, none of these ever escape a component boundary as
//! anything but the degenerate `b"0"` payload or a dropped message — they
//! exist for logging and testing, not for callers to match on.

use thiserror::Error;

use crate::domain_types::ComponentName;

/// Errors raised while decoding or encoding wire envelopes.
#[derive(Debug, Error)]
pub enum WireError {
    /// The bytes did not decode as the expected envelope type.
    #[error("failed to decode {envelope}: {source}")]
    Decode {
        /// Which envelope type failed to decode (`PalmMessage`/`BrokerMessage`).
        envelope: &'static str,
        /// Underlying bincode failure.
        #[source]
        source: bincode::Error,
    },
    /// The bytes did not encode, e.g. a field exceeded an encoder limit.
    #[error("failed to encode {envelope}: {source}")]
    Encode {
        /// Which envelope type failed to encode.
        envelope: &'static str,
        /// Underlying bincode failure.
        #[source]
        source: bincode::Error,
    },
    /// A payload expected to be UTF-8 (e.g. a cache key) was not.
    #[error("payload is not valid utf-8")]
    NotUtf8,
}

/// Errors raised by the process cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The requested key has no value (callers typically treat this as an
    /// absent sentinel rather than propagating it, per §4.6).
    #[error("key {0} not found in cache")]
    NotFound(String),
}

/// Errors raised by the broker's dispatch loop.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// A frame arrived from, or was addressed to, a name never registered
    /// via `register_inbound`/`register_outbound`. Logged critical; the
    /// loop continues per §4.1.
    #[error("unknown component {0}: not registered as inbound or outbound")]
    UnknownComponent(ComponentName),
    /// The named outbound peer's transport has disconnected.
    #[error("outbound channel for {0} closed")]
    OutboundClosed(ComponentName),
    /// The named inbound peer's transport has disconnected.
    #[error("inbound channel for {0} closed")]
    InboundClosed(ComponentName),
}

/// Errors raised by the generic component runtime
/// ([`crate::component::inbound::ComponentInbound`] /
/// [`crate::component::outbound::ComponentOutbound`]).
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Decoding the external payload failed; per §7 this degrades to a
    /// dropped message plus a zero byte forwarded downstream, not a panic.
    #[error("decode error in component {component}: {source}")]
    Decode {
        /// The component where decoding failed.
        component: ComponentName,
        /// Underlying wire error.
        #[source]
        source: WireError,
    },
    /// The broker round-trip channel closed under this component.
    #[error("broker channel closed for component {0}")]
    BrokerChannelClosed(ComponentName),
    /// The external transport closed under this component.
    #[error("external channel closed for component {0}")]
    ExternalChannelClosed(ComponentName),
    /// A user-supplied handler (function registry entry, HTTP call) failed.
    #[error("handler failure in component {component}: {message}")]
    HandlerFailed {
        /// The component where the handler ran.
        component: ComponentName,
        /// Human-readable failure detail, logged with the error.
        message: String,
    },
}

/// Errors raised while validating or loading a [`crate::config`] value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric or string field failed a validation rule.
    #[error("invalid configuration field {field}: {reason}")]
    InvalidField {
        /// The offending field's name.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
    /// Reading or writing the config file failed.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The config file did not parse as JSON.
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Umbrella error uniting every subsystem, for call sites that need a
/// single `Result` type (e.g. assembly construction in
/// [`crate::master::Master`] / [`crate::server::Server`]).
#[derive(Debug, Error)]
pub enum PalmError {
    /// Wire encode/decode failure.
    #[error(transparent)]
    Wire(#[from] WireError),
    /// Cache operation failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Broker dispatch failure.
    #[error(transparent)]
    Broker(#[from] BrokerError),
    /// Component runtime failure.
    #[error(transparent)]
    Component(#[from] ComponentError),
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
