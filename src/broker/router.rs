//! The broker's single-threaded dispatch loop (§4.1).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crossbeam::channel::{Receiver, Select};
use dashmap::DashMap;

use crate::broker::config::BrokerConfig;
use crate::broker::traits::{InboundRoute, OutboundRoute, TapConfig};
use crate::domain_types::ComponentName;
use crate::shutdown::LoopBudget;
use crate::transport::{DuplexEndpoint, Frame};
use crate::wire::TapTag;

/// The central dispatcher: two logical router sockets (realized here as
/// one duplex per registered peer), a routing table, and a bounded
/// per-outbound FIFO buffer. See module docs and spec §4.1.
pub struct Broker {
    config: BrokerConfig,
    inbound_routes: DashMap<ComponentName, InboundRoute>,
    outbound_routes: DashMap<ComponentName, OutboundRoute>,
    inbound_peers: DashMap<ComponentName, DuplexEndpoint>,
    outbound_peers: DashMap<ComponentName, DuplexEndpoint>,
    buffer: Mutex<HashMap<ComponentName, VecDeque<Vec<u8>>>>,
    available: Mutex<HashSet<ComponentName>>,
    buffering: AtomicBool,
    tap: Option<TapConfig>,
}

impl Broker {
    /// Builds an empty broker. Components register before [`Self::start`]
    /// is called; the routing table is read-only once the dispatch loop
    /// begins (§5).
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            inbound_routes: DashMap::new(),
            outbound_routes: DashMap::new(),
            inbound_peers: DashMap::new(),
            outbound_peers: DashMap::new(),
            buffer: Mutex::new(HashMap::new()),
            available: Mutex::new(HashSet::new()),
            buffering: AtomicBool::new(false),
            tap: None,
        }
    }

    /// Wires a tap tee to the [`crate::resilience::ResilienceService`]
    /// (see [`TapConfig`]).
    #[must_use]
    pub fn with_tap(mut self, tap: TapConfig) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Declares that messages arriving from `name` are destined for
    /// `route` (defaulting to `name`, the self-reply case), returning the
    /// duplex endpoint the component should use as its broker socket.
    #[must_use]
    pub fn register_inbound(
        &self,
        name: ComponentName,
        route: Option<ComponentName>,
        log: impl Into<String>,
    ) -> DuplexEndpoint {
        let (broker_side, component_side) = DuplexEndpoint::pair();
        self.inbound_routes.insert(
            name.clone(),
            InboundRoute {
                route: route.unwrap_or_else(|| name.clone()),
                log: log.into(),
            },
        );
        self.inbound_peers.insert(name, broker_side);
        component_side
    }

    /// Declares that `name` may receive routed messages, returning the
    /// duplex endpoint the component should use as its broker socket.
    #[must_use]
    pub fn register_outbound(&self, name: ComponentName, log: impl Into<String>) -> DuplexEndpoint {
        let (broker_side, component_side) = DuplexEndpoint::pair();
        self.outbound_routes.insert(name.clone(), OutboundRoute { log: log.into() });
        self.outbound_peers.insert(name, broker_side);
        component_side
    }

    fn total_buffered(&self, buffer: &HashMap<ComponentName, VecDeque<Vec<u8>>>) -> usize {
        buffer.values().map(VecDeque::len).sum()
    }

    fn tap_emit(&self, tag: TapTag, name: &ComponentName, payload: &[u8]) {
        let Some(tap) = &self.tap else { return };
        let matches = match tag {
            TapTag::To => *name == tap.to_route,
            TapTag::From => *name == tap.from_route,
        };
        if matches {
            let _ = tap.sink.send((tag, payload.to_vec()));
        }
    }

    fn handle_outbound_ready(&self, name: &ComponentName, _frame: Frame) {
        let Some(peer) = self.outbound_peers.get(name) else {
            tracing::error!(component = %name, "critical: outbound-ready from unregistered component");
            return;
        };
        let mut buffer = self.buffer.lock().expect("broker buffer mutex poisoned");
        let popped = buffer.get_mut(name).and_then(VecDeque::pop_front);
        match popped {
            Some(payload) => {
                self.tap_emit(TapTag::To, name, &payload);
                let _ = peer.to_peer.send(Frame::new(name.clone(), payload));
                let total = self.total_buffered(&buffer);
                drop(buffer);
                let threshold = self.config.max_buffer_size.into_inner() / self.config.resume_fraction as usize;
                if self.buffering.load(Ordering::SeqCst) && total < threshold {
                    self.buffering.store(false, Ordering::SeqCst);
                    tracing::info!("broker re-armed inbound reads, backlog below resume threshold");
                }
            }
            None => {
                drop(buffer);
                self.available.lock().expect("broker available mutex poisoned").insert(name.clone());
            }
        }
    }

    fn handle_inbound_ready(&self, name: &ComponentName, frame: Frame) {
        self.tap_emit(TapTag::From, name, &frame.payload);

        let Some(inbound_peer) = self.inbound_peers.get(name) else {
            tracing::error!(component = %name, "critical: inbound-ready from unregistered component");
            return;
        };
        let Some(route) = self.inbound_routes.get(name).map(|r| r.route.clone()) else {
            tracing::error!(component = %name, "critical: no route registered for inbound component");
            return;
        };

        if route == *name {
            // Self-reply: echo the payload straight back (S1).
            let _ = inbound_peer.to_peer.send(Frame::new(name.clone(), frame.payload));
            return;
        }

        if !self.outbound_routes.contains_key(&route) {
            tracing::error!(route = %route, component = %name, "critical: unknown outbound route");
            let _ = inbound_peer.to_peer.send(Frame::new(name.clone(), b"1".to_vec()));
            return;
        }

        let mut available = self.available.lock().expect("broker available mutex poisoned");
        if available.remove(&route) {
            drop(available);
            self.tap_emit(TapTag::To, &route, &frame.payload);
            if let Some(outbound_peer) = self.outbound_peers.get(&route) {
                let _ = outbound_peer.to_peer.send(Frame::new(route.clone(), frame.payload));
            }
        } else {
            drop(available);
            let mut buffer = self.buffer.lock().expect("broker buffer mutex poisoned");
            buffer.entry(route.clone()).or_default().push_back(frame.payload);
            let total = self.total_buffered(&buffer);
            if total >= self.config.max_buffer_size.into_inner() {
                self.buffering.store(true, Ordering::SeqCst);
                tracing::warn!(route = %route, total, "broker buffer at capacity, throttling inbound reads");
            }
        }
        let _ = inbound_peer.to_peer.send(Frame::new(name.clone(), b"1".to_vec()));
    }

    /// Runs the dispatch loop until `budget` is exhausted.
    pub fn start(&self, budget: &LoopBudget) {
        let mut completed = 0usize;
        loop {
            if budget.should_stop(completed) {
                break;
            }

            let outbound_entries: Vec<(ComponentName, Receiver<Frame>)> = self
                .outbound_peers
                .iter()
                .map(|e| (e.key().clone(), e.value().from_peer.clone()))
                .collect();
            let inbound_entries: Vec<(ComponentName, Receiver<Frame>)> = if self.buffering.load(Ordering::SeqCst) {
                Vec::new()
            } else {
                self.inbound_routes
                    .iter()
                    .filter_map(|e| {
                        self.inbound_peers
                            .get(e.key())
                            .map(|peer| (e.key().clone(), peer.value().from_peer.clone()))
                    })
                    .collect()
            };
            let shutdown = budget.shutdown().closed_channel();

            if outbound_entries.is_empty() && inbound_entries.is_empty() {
                // Nothing registered yet, or fully throttled with no
                // outbound peers either: wait on shutdown alone so we
                // don't busy-spin.
                let _ = shutdown.recv();
                break;
            }

            let mut sel = Select::new();
            for (_, rx) in &outbound_entries {
                sel.recv(rx);
            }
            for (_, rx) in &inbound_entries {
                sel.recv(rx);
            }
            sel.recv(shutdown);

            let oper = sel.select();
            let index = oper.index();
            if index < outbound_entries.len() {
                let (name, rx) = &outbound_entries[index];
                match oper.recv(rx) {
                    Ok(frame) => self.handle_outbound_ready(name, frame),
                    Err(_) => {
                        self.outbound_peers.remove(name);
                    }
                }
            } else if index < outbound_entries.len() + inbound_entries.len() {
                let (name, rx) = &inbound_entries[index - outbound_entries.len()];
                match oper.recv(rx) {
                    Ok(frame) => self.handle_inbound_ready(name, frame),
                    Err(_) => {
                        self.inbound_peers.remove(name);
                    }
                }
            } else {
                let _ = oper.recv(shutdown);
                break;
            }

            completed += 1;
        }
    }

    /// Total payloads buffered across all outbound peers, for tests
    /// asserting that total buffer size never exceeds the configured cap.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.total_buffered(&self.buffer.lock().expect("broker buffer mutex poisoned"))
    }
}
