//! The generic ingress half-duplex component (§4.2).

use std::sync::Arc;

use crossbeam::channel::select;
use uuid::Uuid;

use crate::cache::Cache;
use crate::component::hooks::ComponentHooks;
use crate::component::{ComponentConfig, ExternalSocket};
use crate::domain_types::CacheKey;
use crate::error::ComponentError;
use crate::shutdown::LoopBudget;
use crate::transport::{DuplexEndpoint, Frame};
use crate::wire::{BrokerMessage, PalmMessage};

/// Owns one external ingress socket (pull or reply) and a request socket
/// to the broker. See module docs and spec §4.2 for the exact contract.
pub struct ComponentInbound<H: ComponentHooks> {
    config: ComponentConfig,
    external: ExternalSocket,
    to_broker: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    hooks: H,
    budget: LoopBudget,
}

impl<H: ComponentHooks> ComponentInbound<H> {
    /// Builds an inbound component.
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

    /// Mints a fresh broker key and, in palm mode, stashes the sub-payload
    /// (the serialized `PalmMessage`) under it, forwarding only
    /// `{key, payload}` to the broker (§4.2 `_translate_to_broker`). A
    /// `preserve_key` component instead treats the arriving bytes as an
    /// already-framed `BrokerMessage` (echoed back by a worker) and
    /// forwards it under its original key unchanged, so a later egress
    /// hop can still find the stash minted at the first ingress.
    fn translate_to_broker(&self, sub_payload: &[u8]) -> Result<BrokerMessage, ComponentError> {
        if self.config.preserve_key {
            return BrokerMessage::from_bytes(sub_payload).map_err(|source| ComponentError::Decode {
                component: self.config.name.clone(),
                source,
            });
        }
        let key = CacheKey::namespaced(&self.config.name, &Uuid::new_v4().to_string());
        if self.config.palm {
            let palm = PalmMessage::from_bytes(sub_payload).map_err(|source| ComponentError::Decode {
                component: self.config.name.clone(),
                source,
            })?;
            self.cache.set(key.clone(), sub_payload.to_vec());
            Ok(BrokerMessage {
                key: key.into_inner(),
                payload: palm.payload,
            })
        } else {
            Ok(BrokerMessage {
                key: key.into_inner(),
                payload: sub_payload.to_vec(),
            })
        }
    }

    /// Runs the receive/scatter/round-trip/reply loop until the loop
    /// budget is exhausted or a socket closes.
    pub fn start(&self) {
        let mut completed = 0usize;
        loop {
            if self.budget.should_stop(completed) {
                break;
            }

            let external_frame = match self.recv_external() {
                Some(frame) => frame,
                None => break,
            };

            let sub_payloads = self.hooks.scatter(&external_frame.payload);
            for sub in &sub_payloads {
                match self.translate_to_broker(sub) {
                    Ok(broker_msg) => {
                        let Ok(bytes) = broker_msg.to_bytes() else {
                            tracing::error!(component = %self.config.name, "failed to encode broker message");
                            continue;
                        };
                        if self
                            .to_broker
                            .to_peer
                            .send(Frame::new(self.config.name.clone(), bytes))
                            .is_err()
                        {
                            tracing::error!(component = %self.config.name, "broker channel closed");
                            return;
                        }
                        match self.to_broker.from_peer.recv() {
                            Ok(ack) => self.hooks.handle_feedback(&ack.payload),
                            Err(_) => {
                                tracing::error!(component = %self.config.name, "broker channel closed awaiting ack");
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(component = %self.config.name, error = %err, "ingress decode failed, forwarding zero byte through the broker");
                        let key = CacheKey::namespaced(&self.config.name, &Uuid::new_v4().to_string());
                        let degenerate = BrokerMessage {
                            key: key.into_inner(),
                            payload: b"0".to_vec(),
                        };
                        let Ok(bytes) = degenerate.to_bytes() else {
                            tracing::error!(component = %self.config.name, "failed to encode degenerate broker message");
                            continue;
                        };
                        if self
                            .to_broker
                            .to_peer
                            .send(Frame::new(self.config.name.clone(), bytes))
                            .is_err()
                        {
                            tracing::error!(component = %self.config.name, "broker channel closed");
                            return;
                        }
                        match self.to_broker.from_peer.recv() {
                            Ok(ack) => self.hooks.handle_feedback(&ack.payload),
                            Err(_) => {
                                tracing::error!(component = %self.config.name, "broker channel closed awaiting ack");
                                return;
                            }
                        }
                    }
                }
            }

            if self.config.expects_reply {
                if let ExternalSocket::Duplex(duplex) = &self.external {
                    let reply = self.hooks.reply_feedback();
                    let _ = duplex.to_peer.send(Frame::new(self.config.name.clone(), reply));
                }
            }

            completed += 1;
        }
    }

    fn recv_external(&self) -> Option<Frame> {
        let shutdown = self.budget.shutdown().closed_channel();
        match &self.external {
            ExternalSocket::Pull(rx) => {
                select! {
                    recv(rx) -> msg => msg.ok(),
                    recv(shutdown) -> _ => None,
                }
            }
            ExternalSocket::Duplex(duplex) => {
                select! {
                    recv(duplex.from_peer) -> msg => msg.ok(),
                    recv(shutdown) -> _ => None,
                }
            }
            ExternalSocket::Push(_) => {
                unreachable!("an inbound component never owns a push-only external socket")
            }
        }
    }
}
