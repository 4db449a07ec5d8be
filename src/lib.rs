//! PALM — a broker-centred runtime for composing high-throughput
//! distributed pipelines out of small uniform components that exchange
//! length-prefixed binary messages over message-queue transports.
//!
//! The hard part lives in [`broker`] (the routing state machine and its
//! buffering/backpressure policy) and in [`component`] (the generic
//! ingress/egress contracts every concrete service in [`services`] is
//! built from). [`master`] and [`server`] wire those pieces into the two
//! process assemblies this crate ships.

pub mod broker;
pub mod cache;
pub mod cache_service;
pub mod collectors;
pub mod component;
pub mod config;
pub mod domain_types;
pub mod error;
pub mod master;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod server;
pub mod services;
pub mod shutdown;
pub mod transport;
pub mod wire;

pub use error::PalmError;
