//! `Master` (§2, §4.1): the broker-based assembly wiring
//! inbound→worker→outbound with a resilience service and cache.
//!
//! Registration mirrors the original's `Master` wiring exactly: the
//! external ingress routes to the worker-push outbound, worker results
//! route to the external egress, and the resilience service taps both
//! worker-facing routes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::broker::{Broker, TapConfig};
use crate::cache::Cache;
use crate::cache_service::CacheService;
use crate::collectors::{Pinger, PerformanceCounter};
use crate::config::MasterConfig;
use crate::domain_types::ComponentName;
use crate::observability::LogBridgeLayer;
use crate::resilience::{spawn_flush_timer, ResilienceService};
use crate::services;
use crate::shutdown::{LoopBudget, ShutdownSignal};
use crate::transport::Transport;

fn n(s: &str) -> ComponentName {
    ComponentName::try_new(s.to_string()).expect("literal component names are never empty")
}

/// The broker-based server assembly: owns no threads itself until
/// [`Self::start`] is called, at which point every component, the
/// broker, and the resilience service each get their own thread (§5).
pub struct Master {
    config: MasterConfig,
    cache: Arc<dyn Cache>,
    transport: Arc<Transport>,
}

impl Master {
    /// Builds a master assembly.
    #[must_use]
    pub fn new(config: MasterConfig, cache: Arc<dyn Cache>, transport: Arc<Transport>) -> Self {
        Self { config, cache, transport }
    }

    /// Wires every component and spawns one thread per component plus
    /// the broker and resilience service, returning their join handles.
    /// Callers choose whether to block on them (production) or use a
    /// finite `budget` and join for a deterministic test.
    #[must_use]
    pub fn start(&self, budget: LoopBudget, shutdown: ShutdownSignal) -> Vec<JoinHandle<()>> {
        let (tap_tx, tap_rx) = crossbeam::channel::unbounded();
        let broker = Arc::new(
            Broker::new(self.config.broker.clone()).with_tap(TapConfig {
                to_route: n("WorkerPush"),
                from_route: n("WorkerPull"),
                sink: tap_tx,
            }),
        );

        let pull_to_broker = broker.register_inbound(n("Pull"), Some(n("WorkerPush")), "to_broker");
        let worker_pull_to_broker = broker.register_inbound(n("WorkerPull"), Some(n("Push")), "from_broker");
        let worker_push_to_broker = broker.register_outbound(n("WorkerPush"), "to_broker");
        let push_to_broker = broker.register_outbound(n("Push"), "to_sink");
        let resilience_to_broker = broker.register_inbound(n("Resilience"), Some(n("WorkerPush")), "resilience_resend");

        let flush_ticks = spawn_flush_timer(self.config.broker.flush_interval, shutdown.clone());
        let resilience = ResilienceService::new(n("Resilience"), tap_rx, flush_ticks, resilience_to_broker);

        let ingress = services::pull_service(
            n("Pull"),
            &self.config.pull_address,
            &self.transport,
            pull_to_broker,
            self.cache.clone(),
            self.config.palm,
            budget.clone(),
        );
        let worker_pull = services::worker_pull_service(
            n("WorkerPull"),
            &self.config.worker_pull_address,
            &self.transport,
            worker_pull_to_broker,
            self.cache.clone(),
            budget.clone(),
        );
        let worker_push = services::worker_push_service(
            n("WorkerPush"),
            &self.config.worker_push_address,
            &self.transport,
            worker_push_to_broker,
            self.cache.clone(),
            budget.clone(),
        );
        let egress = services::push_connection(
            n("Push"),
            &self.config.next_address,
            &self.transport,
            push_to_broker,
            self.cache.clone(),
            self.config.palm,
            budget.clone(),
        );
        let cache_service = CacheService::new(
            n("Cache"),
            self.transport.bind_duplex(&self.config.db_address),
            self.cache.clone(),
            budget.clone(),
        );

        let broker_handle = broker.clone();
        let broker_budget = budget.clone();
        let mut handles = Vec::new();
        handles.push(thread::spawn(move || broker_handle.start(&broker_budget)));
        handles.push(thread::spawn(move || ingress.start()));
        handles.push(thread::spawn(move || worker_pull.start()));
        handles.push(thread::spawn(move || worker_push.start()));
        handles.push(thread::spawn(move || egress.start()));
        handles.push(thread::spawn(move || cache_service.start()));
        handles.push(thread::spawn(move || resilience.start(&shutdown)));
        handles
    }

    /// Spawns a `Pinger` on its own thread if `ping_address` is configured,
    /// mirroring [`crate::server::Server::spawn_pinger`].
    pub fn spawn_pinger(&self, every: Duration, pings: usize) -> Option<thread::JoinHandle<()>> {
        let address = self.config.ping_address.clone()?;
        let outbox = self.transport.connect_push(&address);
        let pinger = Pinger::new(self.config.name.clone(), outbox, every);
        Some(thread::spawn(move || pinger.start(pings)))
    }

    /// Builds a `PerformanceCounter` wired to `perf_address`, if
    /// configured, mirroring [`crate::server::Server::performance_counter`].
    #[must_use]
    pub fn performance_counter(&self) -> Option<PerformanceCounter> {
        let address = self.config.perf_address.clone()?;
        Some(PerformanceCounter::new(self.config.name.clone(), self.transport.connect_push(&address)))
    }

    /// Builds a `LogBridgeLayer` wired to `log_address`, if configured, for
    /// installation onto this process's `tracing` subscriber — the same
    /// push-and-forget direction the original's `Master` uses a
    /// `PushHandler(log_address)` logging handler for.
    #[must_use]
    pub fn log_bridge_layer(&self, level: tracing::Level) -> Option<LogBridgeLayer> {
        let address = self.config.log_address.clone()?;
        Some(LogBridgeLayer::new(self.transport.connect_push(&address), self.config.name.clone(), level))
    }
}
