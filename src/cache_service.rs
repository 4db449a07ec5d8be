//! `CacheService` (§4.6): a reply socket exposing the process cache over
//! the network using `PalmMessage` framing.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::Cache;
use crate::domain_types::{CacheKey, ComponentName};
use crate::shutdown::LoopBudget;
use crate::transport::{DuplexEndpoint, Frame};
use crate::wire::PalmMessage;

/// Decodes `function` as `"<anything>.<op>"` and dispatches `set`/`get`/
/// `delete` against the shared process cache.
pub struct CacheService {
    name: ComponentName,
    external: DuplexEndpoint,
    cache: Arc<dyn Cache>,
    budget: LoopBudget,
}

impl CacheService {
    /// Builds a cache service bound to `external` (a `RepBypassService`
    /// style duplex — this side channel does not traverse the broker).
    #[must_use]
    pub fn new(name: ComponentName, external: DuplexEndpoint, cache: Arc<dyn Cache>, budget: LoopBudget) -> Self {
        Self {
            name,
            external,
            cache,
            budget,
        }
    }

    fn handle(&self, payload: &[u8]) -> Vec<u8> {
        let Ok(message) = PalmMessage::from_bytes(payload) else {
            tracing::error!(service = %self.name, "cache service received an undecodable frame");
            return Vec::new();
        };
        let op = message.function.split_once('.').map_or(message.function.as_str(), |(_, op)| op);

        match op {
            "set" => {
                let key = message.cache.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
                tracing::debug!(service = %self.name, key, "cache service: set");
                match CacheKey::try_new(key.clone()) {
                    Ok(cache_key) => {
                        self.cache.set(cache_key, message.payload);
                        key.into_bytes()
                    }
                    Err(_) => Vec::new(),
                }
            }
            "get" => match String::from_utf8(message.payload) {
                Ok(key) => {
                    tracing::debug!(service = %self.name, key, "cache service: get");
                    match CacheKey::try_new(key) {
                        // Open Question 5: a miss replies with an explicit
                        // empty frame, the absent sentinel.
                        Ok(cache_key) => self.cache.get(&cache_key).unwrap_or_default(),
                        Err(_) => Vec::new(),
                    }
                }
                Err(_) => Vec::new(),
            },
            "delete" => match String::from_utf8(message.payload) {
                Ok(key) => {
                    tracing::debug!(service = %self.name, key, "cache service: delete");
                    if let Ok(cache_key) = CacheKey::try_new(key.clone()) {
                        self.cache.delete(&cache_key);
                    }
                    key.into_bytes()
                }
                Err(_) => Vec::new(),
            },
            other => {
                tracing::error!(service = %self.name, op = other, "cache service: unknown operation");
                Vec::new()
            }
        }
    }

    /// Runs the reply loop until the loop budget is exhausted.
    pub fn start(&self) {
        let mut completed = 0usize;
        loop {
            if self.budget.should_stop(completed) {
                break;
            }
            let frame = crossbeam::channel::select! {
                recv(self.external.from_peer) -> msg => match msg {
                    Ok(frame) => frame,
                    Err(_) => break,
                },
                recv(self.budget.shutdown().closed_channel()) -> _ => break,
            };
            let reply = self.handle(&frame.payload);
            if self
                .external
                .to_peer
                .send(Frame::new(self.name.clone(), reply))
                .is_err()
            {
                break;
            }
            completed += 1;
        }
    }
}
