//! The two end-to-end envelope types and their binary framing.
//!
//! Both envelopes are encoded with `serde` + `bincode`, which gives
//! stable, length-prefixed binary records and represents
//! `PalmMessage.cache: Option<String>` with native explicit-presence
//! semantics, matching `HasField('cache')` in the original.

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// The end-to-end envelope produced by clients and carried in full inside
/// the cache stash while only its stripped-down [`BrokerMessage`]
/// counterpart traverses the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalmMessage {
    /// Routing topic for pub/sub reply.
    pub client: String,
    /// Correlates a logical job across messages.
    pub pipeline: String,
    /// `"<server>.<method>"` selector.
    pub function: String,
    /// Monotonically increasing step counter.
    pub stage: u32,
    /// Opaque user bytes.
    pub payload: Vec<u8>,
    /// A key into the process cache. `None` and `Some(String::new())` are
    /// distinct states — explicit-presence, not "empty means absent".
    pub cache: Option<String>,
}

impl PalmMessage {
    /// Encodes this envelope to its wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        bincode::serialize(self).map_err(|source| WireError::Encode {
            envelope: "PalmMessage",
            source,
        })
    }

    /// Decodes an envelope from wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        bincode::deserialize(bytes).map_err(|source| WireError::Decode {
            envelope: "PalmMessage",
            source,
        })
    }

    /// Returns a copy of this envelope with `payload` replaced, the
    /// splice operation a [`crate::component::outbound::ComponentOutbound`]
    /// performs at egress after fetching the stashed envelope.
    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}

/// The internal envelope that actually crosses the broker: just enough to
/// route and carry a payload, with the full [`PalmMessage`] (if any)
/// stashed in the cache under `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerMessage {
    /// Fresh unique identifier minted at ingress.
    pub key: String,
    /// Opaque bytes, either the raw payload (non-palm mode) or the
    /// PalmMessage's `payload` field alone (palm mode).
    pub payload: Vec<u8>,
}

impl BrokerMessage {
    /// Encodes this envelope to its wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        bincode::serialize(self).map_err(|source| WireError::Encode {
            envelope: "BrokerMessage",
            source,
        })
    }

    /// Decodes an envelope from wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        bincode::deserialize(bytes).map_err(|source| WireError::Decode {
            envelope: "BrokerMessage",
            source,
        })
    }
}

/// The direction tag on a [`crate::resilience::ResilienceService`] tap
/// frame: a two-part message `(tag, body)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapTag {
    /// Broker is dispatching this message to the worker fleet.
    To,
    /// A worker result is returning through the broker.
    From,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palm_message_round_trips_through_bytes() {
        let msg = PalmMessage {
            client: "c".into(),
            pipeline: "p".into(),
            function: "s.f".into(),
            stage: 1,
            payload: b"X".to_vec(),
            cache: Some("k".into()),
        };
        let bytes = msg.to_bytes().unwrap();
        let back = PalmMessage::from_bytes(&bytes).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn palm_message_cache_none_is_distinct_from_empty_string() {
        let absent = PalmMessage {
            client: String::new(),
            pipeline: String::new(),
            function: "s.f".into(),
            stage: 0,
            payload: vec![],
            cache: None,
        };
        let present_empty = PalmMessage {
            cache: Some(String::new()),
            ..absent.clone()
        };
        assert_ne!(absent, present_empty);
        let back_absent = PalmMessage::from_bytes(&absent.to_bytes().unwrap()).unwrap();
        let back_present = PalmMessage::from_bytes(&present_empty.to_bytes().unwrap()).unwrap();
        assert!(back_absent.cache.is_none());
        assert_eq!(back_present.cache, Some(String::new()));
    }

    #[test]
    fn broker_message_round_trips() {
        let msg = BrokerMessage {
            key: "abc".into(),
            payload: b"hello".to_vec(),
        };
        let back = BrokerMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(msg, back);
    }
}
