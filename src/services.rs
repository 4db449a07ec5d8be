//! Concrete service/connection constructors (§4.4): thin policy wrappers
//! selecting `(socket_kind, bind_vs_connect, expects_reply)` over the
//! generic [`crate::component`] pair, replacing the original's
//! per-socket-type subclasses with composition (§9).

use std::sync::Arc;

use crate::cache::Cache;
use crate::component::hooks::{DefaultHooks, EchoHooks};
use crate::component::{ComponentConfig, ComponentInbound, ComponentOutbound, ExternalSocket, HttpTarget};
use crate::domain_types::ComponentName;
use crate::shutdown::LoopBudget;
use crate::transport::{DuplexEndpoint, Transport};

/// `PullService` — external producer to broker, bound pull, no reply.
#[must_use]
pub fn pull_service(
    name: ComponentName,
    bind_endpoint: &str,
    transport: &Transport,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    palm: bool,
    budget: LoopBudget,
) -> ComponentInbound<DefaultHooks> {
    let config = ComponentConfig::new(name).with_palm(palm).with_expects_reply(false);
    let external = ExternalSocket::Pull(transport.bind_pull(bind_endpoint));
    ComponentInbound::new(config, external, to_broker, cache, DefaultHooks, budget)
}

/// `RepService` — external request/reply, bound reply, always replies.
#[must_use]
pub fn rep_service(
    name: ComponentName,
    bind_endpoint: &str,
    transport: &Transport,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    palm: bool,
    budget: LoopBudget,
) -> ComponentInbound<EchoHooks> {
    let config = ComponentConfig::new(name).with_palm(palm).with_expects_reply(true);
    let external = ExternalSocket::Duplex(transport.bind_duplex(bind_endpoint));
    ComponentInbound::new(config, external, to_broker, cache, EchoHooks::default(), budget)
}

/// `WorkerPullService` — worker results to broker, bound pull, no reply.
/// Carries the `BrokerMessage` key across the worker hop unchanged
/// (`preserve_key`) so the matching `WorkerPushService`'s stash, minted
/// back at the original ingress, can still be found at egress.
#[must_use]
pub fn worker_pull_service(
    name: ComponentName,
    bind_endpoint: &str,
    transport: &Transport,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    budget: LoopBudget,
) -> ComponentInbound<DefaultHooks> {
    let config = ComponentConfig::new(name).with_expects_reply(false).with_preserve_key(true);
    let external = ExternalSocket::Pull(transport.bind_pull(bind_endpoint));
    ComponentInbound::new(config, external, to_broker, cache, DefaultHooks, budget)
}

/// `WorkerPushService` — broker to workers, bound push, no reply.
/// `preserve_key`-paired with [`worker_pull_service`]; see there.
#[must_use]
pub fn worker_push_service(
    name: ComponentName,
    bind_endpoint: &str,
    transport: &Transport,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    budget: LoopBudget,
) -> ComponentOutbound<DefaultHooks> {
    let config = ComponentConfig::new(name).with_expects_reply(false).with_preserve_key(true);
    let external = ExternalSocket::Push(transport.connect_push(bind_endpoint));
    ComponentOutbound::new(config, external, to_broker, cache, DefaultHooks, budget)
}

/// `PullConnection` — external producer to broker, connected pull, no reply.
#[must_use]
pub fn pull_connection(
    name: ComponentName,
    connect_endpoint: &str,
    transport: &Transport,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    palm: bool,
    budget: LoopBudget,
) -> ComponentInbound<DefaultHooks> {
    let config = ComponentConfig::new(name).with_palm(palm).with_expects_reply(false);
    let external = ExternalSocket::Pull(transport.bind_pull(connect_endpoint));
    ComponentInbound::new(config, external, to_broker, cache, DefaultHooks, budget)
}

/// `RepConnection` — external request/reply, connected, always replies.
#[must_use]
pub fn rep_connection(
    name: ComponentName,
    connect_endpoint: &str,
    transport: &Transport,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    palm: bool,
    budget: LoopBudget,
) -> ComponentInbound<EchoHooks> {
    let config = ComponentConfig::new(name).with_palm(palm).with_expects_reply(true);
    let external = ExternalSocket::Duplex(transport.connect_duplex(connect_endpoint));
    ComponentInbound::new(config, external, to_broker, cache, EchoHooks::default(), budget)
}

/// `PushConnection` — broker to external consumer, connected push, no reply.
#[must_use]
pub fn push_connection(
    name: ComponentName,
    connect_endpoint: &str,
    transport: &Transport,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    palm: bool,
    budget: LoopBudget,
) -> ComponentOutbound<DefaultHooks> {
    let config = ComponentConfig::new(name).with_palm(palm).with_expects_reply(false);
    let external = ExternalSocket::Push(transport.connect_push(connect_endpoint));
    ComponentOutbound::new(config, external, to_broker, cache, DefaultHooks, budget)
}

/// `HttpConnection` — broker to an HTTP endpoint via a bounded worker
/// pool of blocking POST calls (§4.4).
#[must_use]
pub fn http_connection(
    name: ComponentName,
    url: impl Into<String>,
    workers: usize,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    palm: bool,
    budget: LoopBudget,
) -> ComponentOutbound<DefaultHooks> {
    let config = ComponentConfig::new(name).with_palm(palm).with_expects_reply(true);
    let external = ExternalSocket::Http(HttpTarget::new(url, workers));
    ComponentOutbound::new(config, external, to_broker, cache, DefaultHooks, budget)
}

/// `PushBypassConnection` — a side channel (log, ping, perf) that does
/// not traverse the broker: connects a push socket and sends
/// fire-and-forget frames.
#[must_use]
pub fn push_bypass_connection(
    name: ComponentName,
    connect_endpoint: &str,
    transport: &Transport,
) -> crossbeam::channel::Sender<crate::transport::Frame> {
    let _ = &name;
    transport.connect_push(connect_endpoint)
}

/// `PullBypassConnection` — a side channel's bound receiving half.
#[must_use]
pub fn pull_bypass_connection(
    bind_endpoint: &str,
    transport: &Transport,
) -> crossbeam::channel::Receiver<crate::transport::Frame> {
    transport.bind_pull(bind_endpoint)
}
