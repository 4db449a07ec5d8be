//! The generic egress half-duplex component (§4.3).

use std::sync::Arc;

use crossbeam::channel::select;
use rayon::ThreadPoolBuilder;

use crate::cache::Cache;
use crate::component::hooks::ComponentHooks;
use crate::component::{ComponentConfig, ExternalSocket};
use crate::domain_types::CacheKey;
use crate::shutdown::LoopBudget;
use crate::transport::{DuplexEndpoint, Frame};
use crate::wire::{BrokerMessage, PalmMessage};

/// Owns one external egress socket (push, request, or an HTTP worker
/// pool) and a request socket to the broker. See spec §4.3.
pub struct ComponentOutbound<H: ComponentHooks> {
    config: ComponentConfig,
    external: ExternalSocket,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    hooks: H,
    budget: LoopBudget,
}

impl<H: ComponentHooks> ComponentOutbound<H> {
    /// Builds an outbound component.
    #[must_use]
    pub fn new(
        config: ComponentConfig,
        external: ExternalSocket,
        to_broker: DuplexEndpoint,
        cache: Arc<dyn Cache>,
        hooks: H,
        budget: LoopBudget,
    ) -> Self {
        Self {
            config,
            external,
            to_broker,
            cache,
            hooks,
            budget,
        }
    }

    /// Parses the `BrokerMessage` and, in palm mode, splices its payload
    /// into the stashed `PalmMessage`, deleting the stash afterward
    /// (Open Question 1: explicit deletion at egress after splicing). A
    /// `preserve_key` component instead re-emits the whole
    /// `{key, payload}` frame unchanged, so whatever receives it (a
    /// worker) can echo the key straight back on the return trip.
    /// Non-palm, non-`preserve_key` mode emits the broker payload
    /// unchanged.
    fn translate_from_broker(&self, broker_msg: &BrokerMessage) -> Vec<u8> {
        if self.config.preserve_key {
            return broker_msg.to_bytes().unwrap_or_else(|_| broker_msg.payload.clone());
        }
        if !self.config.palm {
            return broker_msg.payload.clone();
        }
        let Ok(key) = CacheKey::try_new(broker_msg.key.clone()) else {
            return broker_msg.payload.clone();
        };
        match self.cache.get(&key) {
            Some(stashed) => match PalmMessage::from_bytes(&stashed) {
                Ok(envelope) => {
                    let spliced = envelope.with_payload(broker_msg.payload.clone());
                    self.cache.delete(&key);
                    spliced.to_bytes().unwrap_or_else(|_| broker_msg.payload.clone())
                }
                Err(_) => broker_msg.payload.clone(),
            },
            None => {
                tracing::warn!(component = %self.config.name, key = %key, "no stashed envelope found for egress splice");
                broker_msg.payload.clone()
            }
        }
    }

    /// Runs the availability-signal/receive/scatter/send/feedback loop
    /// until the loop budget is exhausted or a socket closes.
    pub fn start(&self) {
        // Initial availability signal (§4.3: "sends an initial b'1' to
        // signal availability").
        if self
            .to_broker
            .to_peer
            .send(Frame::new(self.config.name.clone(), b"1".to_vec()))
            .is_err()
        {
            return;
        }

        let mut completed = 0usize;
        loop {
            if self.budget.should_stop(completed) {
                break;
            }

            let shutdown = self.budget.shutdown().closed_channel();
            let broker_frame = select! {
                recv(self.to_broker.from_peer) -> msg => match msg {
                    Ok(frame) => frame,
                    Err(_) => break,
                },
                recv(shutdown) -> _ => break,
            };

            let Ok(broker_msg) = BrokerMessage::from_bytes(&broker_frame.payload) else {
                tracing::error!(component = %self.config.name, "failed to decode broker message");
                if self
                    .to_broker
                    .to_peer
                    .send(Frame::new(self.config.name.clone(), b"1".to_vec()))
                    .is_err()
                {
                    break;
                }
                completed += 1;
                continue;
            };

            let emit_payload = self.translate_from_broker(&broker_msg);
            let sub_payloads = self.hooks.scatter(&emit_payload);

            match &self.external {
                ExternalSocket::Push(tx) => {
                    for sub in &sub_payloads {
                        let _ = tx.send(Frame::new(self.config.name.clone(), sub.clone()));
                    }
                }
                ExternalSocket::Duplex(duplex) => {
                    for sub in &sub_payloads {
                        if duplex
                            .to_peer
                            .send(Frame::new(self.config.name.clone(), sub.clone()))
                            .is_err()
                        {
                            break;
                        }
                        if self.config.expects_reply {
                            if let Ok(reply) = duplex.from_peer.recv() {
                                self.hooks.handle_feedback(&reply.payload);
                            }
                        }
                    }
                }
                ExternalSocket::Http(target) => self.dispatch_http(target, &sub_payloads),
                ExternalSocket::Pull(_) => {
                    unreachable!("an outbound component never owns a pull-only external socket")
                }
            }

            let reply = self.hooks.reply_feedback();
            if self
                .to_broker
                .to_peer
                .send(Frame::new(self.config.name.clone(), reply))
                .is_err()
            {
                break;
            }

            completed += 1;
        }
    }

    /// Delivers every scattered sub-payload as a blocking HTTP POST over a
    /// bounded `rayon` pool, aggregating feedback last-wins over
    /// completion order (§4.4 "HttpConnection").
    fn dispatch_http(&self, target: &crate::component::HttpTarget, sub_payloads: &[Vec<u8>]) {
        let Ok(pool) = ThreadPoolBuilder::new().num_threads(target.workers).build() else {
            tracing::error!(component = %self.config.name, "failed to build http worker pool");
            return;
        };
        let client = reqwest::blocking::Client::new();
        let url = target.url.clone();
        let results: Vec<Option<Vec<u8>>> = pool.install(|| {
            use rayon::prelude::*;
            sub_payloads
                .par_iter()
                .map(|payload| {
                    client
                        .post(&url)
                        .body(payload.clone())
                        .send()
                        .and_then(reqwest::blocking::Response::bytes)
                        .map(|bytes| bytes.to_vec())
                        .ok()
                })
                .collect()
        });
        if let Some(last) = results.into_iter().flatten().last() {
            self.hooks.handle_feedback(&last);
        }
    }
}
