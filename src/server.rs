//! `Server` (§0 supplemented functionality): the single-stage, non-broker
//! assembly — one bound pull, one connected push, a `CacheService`, a
//! `PerformanceCounter`, a `Pinger` — dispatching `function` to a static
//! [`crate::registry::FunctionRegistry`].

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::select;

use crate::cache::Cache;
use crate::cache_service::CacheService;
use crate::collectors::{Pinger, PerformanceCounter};
use crate::config::ServerConfig;
use crate::domain_types::FunctionName;
use crate::registry::{DispatchOutcome, FunctionRegistry};
use crate::shutdown::LoopBudget;
use crate::transport::{Frame, Transport};
use crate::wire::PalmMessage;

/// The single-stage server assembly.
pub struct Server {
    config: ServerConfig,
    registry: FunctionRegistry,
    cache: Arc<dyn Cache>,
    transport: Arc<Transport>,
}

impl Server {
    /// Builds a server over `registry`'s handlers.
    #[must_use]
    pub fn new(config: ServerConfig, registry: FunctionRegistry, cache: Arc<dyn Cache>, transport: Arc<Transport>) -> Self {
        Self {
            config,
            registry,
            cache,
            transport,
        }
    }

    fn process(&self, payload: &[u8]) -> Vec<u8> {
        if !self.config.palm {
            return payload.to_vec();
        }
        let Ok(message) = PalmMessage::from_bytes(payload) else {
            tracing::error!(server = %self.config.name, "decode error on ingress, forwarding zero byte");
            return b"0".to_vec();
        };
        let Ok(function) = FunctionName::try_new(message.function.clone()) else {
            tracing::error!(server = %self.config.name, function = message.function, "empty function selector");
            return b"0".to_vec();
        };
        let (response, outcome) = self.registry.dispatch(&function, &message.payload);
        match outcome {
            DispatchOutcome::Handled => {}
            DispatchOutcome::UnknownFunction => {
                tracing::error!(server = %self.config.name, function = %function, "unknown function");
            }
            DispatchOutcome::HandlerPanicked => {
                tracing::error!(server = %self.config.name, function = %function, "user function raised");
            }
        }
        message.with_payload(response).to_bytes().unwrap_or_else(|_| b"0".to_vec())
    }

    /// Runs the ingress/dispatch/egress loop until `budget` is exhausted.
    /// Does not spawn side channels; see [`Self::spawn_cache_service`] /
    /// [`Self::spawn_pinger`] / [`Self::spawn_performance_counter`] for
    /// those.
    pub fn run(&self, budget: &LoopBudget) {
        let pull = self.transport.bind_pull(&self.config.pull_address);
        let push = self.transport.connect_push(&self.config.next_address);
        let mut completed = 0usize;
        loop {
            if budget.should_stop(completed) {
                break;
            }
            let frame = select! {
                recv(pull) -> msg => match msg {
                    Ok(frame) => frame,
                    Err(_) => break,
                },
                recv(budget.shutdown().closed_channel()) -> _ => break,
            };
            let response = self.process(&frame.payload);
            if push.send(Frame::new(self.config.name.clone(), response)).is_err() {
                break;
            }
            completed += 1;
        }
    }

    /// Spawns this server's `CacheService` on its own thread, bound to
    /// `db_address`.
    pub fn spawn_cache_service(&self, budget: LoopBudget) -> thread::JoinHandle<()> {
        let service = CacheService::new(
            self.config.name.clone(),
            self.transport.bind_duplex(&self.config.db_address),
            self.cache.clone(),
            budget,
        );
        thread::spawn(move || service.start())
    }

    /// Spawns a `Pinger` on its own thread if `ping_address` is configured.
    pub fn spawn_pinger(&self, every: Duration, pings: usize) -> Option<thread::JoinHandle<()>> {
        let address = self.config.ping_address.clone()?;
        let outbox = self.transport.connect_push(&address);
        let pinger = Pinger::new(self.config.name.clone(), outbox, every);
        Some(thread::spawn(move || pinger.start(pings)))
    }

    /// Builds a `PerformanceCounter` wired to `perf_address`, if
    /// configured, for this server's handlers to call `tick` on.
    #[must_use]
    pub fn performance_counter(&self) -> Option<PerformanceCounter> {
        let address = self.config.perf_address.clone()?;
        Some(PerformanceCounter::new(self.config.name.clone(), self.transport.connect_push(&address)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::domain_types::{ComponentName, MessageCap};
    use crate::shutdown::ShutdownSignal;

    fn name(s: &str) -> ComponentName {
        ComponentName::try_new(s.to_string()).unwrap()
    }

    #[test]
    fn unknown_function_degrades_to_zero_payload() {
        let transport = Arc::new(Transport::new());
        let config = ServerConfig::new(name("srv"), "inproc://in", "inproc://out", "inproc://db");
        let server = Server::new(config, FunctionRegistry::new(), InMemoryCache::shared(), transport.clone());

        let producer = transport.connect_push("inproc://in");
        let consumer = transport.bind_pull("inproc://out");
        let msg = PalmMessage {
            client: String::new(),
            pipeline: "p".into(),
            function: "srv.missing".into(),
            stage: 0,
            payload: b"X".to_vec(),
            cache: None,
        };
        producer.send(Frame::new(name("client"), msg.to_bytes().unwrap())).unwrap();

        let budget = LoopBudget::capped(MessageCap::new(1), ShutdownSignal::never());
        server.run(&budget);

        let reply = consumer.recv().unwrap();
        let decoded = PalmMessage::from_bytes(&reply.payload).unwrap();
        assert_eq!(decoded.payload, b"0");
    }

    #[test]
    fn registered_handler_echoes_payload() {
        let transport = Arc::new(Transport::new());
        let config = ServerConfig::new(name("srv"), "inproc://in2", "inproc://out2", "inproc://db2");
        let mut registry = FunctionRegistry::new();
        registry.register("echo", Box::new(|payload: &[u8]| payload.to_vec()));
        let server = Server::new(config, registry, InMemoryCache::shared(), transport.clone());

        let producer = transport.connect_push("inproc://in2");
        let consumer = transport.bind_pull("inproc://out2");
        let msg = PalmMessage {
            client: String::new(),
            pipeline: "p".into(),
            function: "srv.echo".into(),
            stage: 0,
            payload: b"hello".to_vec(),
            cache: None,
        };
        producer.send(Frame::new(name("client"), msg.to_bytes().unwrap())).unwrap();

        let budget = LoopBudget::capped(MessageCap::new(1), ShutdownSignal::never());
        server.run(&budget);

        let reply = consumer.recv().unwrap();
        let decoded = PalmMessage::from_bytes(&reply.payload).unwrap();
        assert_eq!(decoded.payload, b"hello");
    }
}
