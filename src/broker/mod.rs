//! The broker/router (§4.1): central dispatcher, routing table, and
//! bounded per-outbound FIFO buffer.

pub mod config;
pub mod router;
pub mod traits;

pub use config::{BrokerConfig, BrokerConfigBuilder};
pub use router::Broker;
pub use traits::{InboundRoute, OutboundRoute, TapConfig};
