//! Static function registry (§9 re-architecture guidance): replaces the
//! original's dynamic `function.split('.')` + `getattr` dispatch with an
//! explicit `name -> handler` table registered at server construction.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use crate::domain_types::FunctionName;

/// A registered handler: takes the message payload, returns the response
/// payload. Handlers never see the cache key directly; palm-mode
/// splicing happens in [`crate::component::outbound::ComponentOutbound`].
pub type Handler = Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// Why a [`FunctionRegistry::dispatch`] call degraded to the `b"0"`
/// sentinel (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and produced a payload.
    Handled,
    /// No handler was registered for the method name.
    UnknownFunction,
    /// The handler panicked; its payload is logged, not returned.
    HandlerPanicked,
}

/// Maps `"<server>.<method>"` selectors to statically registered
/// handlers, the [`crate::server::Server`] assembly's dispatch table.
#[derive(Default)]
pub struct FunctionRegistry {
    handlers: HashMap<String, Handler>,
}

impl FunctionRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` under `method` (the part of `function` after
    /// the server name).
    pub fn register(&mut self, method: impl Into<String>, handler: Handler) {
        self.handlers.insert(method.into(), handler);
    }

    /// Dispatches `function` with `payload`. Unknown methods and handler
    /// panics both degrade to the `b"0"` sentinel per §7, distinguished
    /// only in the returned [`DispatchOutcome`] for logging.
    #[must_use]
    pub fn dispatch(&self, function: &FunctionName, payload: &[u8]) -> (Vec<u8>, DispatchOutcome) {
        let method = function.method();
        let Some(handler) = self.handlers.get(method) else {
            return (b"0".to_vec(), DispatchOutcome::UnknownFunction);
        };
        match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
            Ok(response) => (response, DispatchOutcome::Handled),
            Err(_) => (b"0".to_vec(), DispatchOutcome::HandlerPanicked),
        }
    }
}
