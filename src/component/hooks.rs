//! The `scatter`/`handle_feedback`/`reply_feedback` strategy hooks that
//! replace the original's per-subclass overrides (§9 re-architecture
//! guidance: "replace inheritance with composition ... become injected
//! functions (strategy pattern) with sensible defaults").

/// Behavior injected into a generic [`crate::component::inbound::ComponentInbound`]
/// or [`crate::component::outbound::ComponentOutbound`]. All three hooks
/// have defaults matching the original's base-class behavior, so most
/// concrete services in [`crate::services`] need only supply a
/// [`crate::component::ComponentConfig`].
pub trait ComponentHooks: Send + Sync {
    /// Expands one received payload into the sub-payloads each taking an
    /// independent broker round-trip. Default: yields the input once.
    fn scatter(&self, payload: &[u8]) -> Vec<Vec<u8>> {
        vec![payload.to_vec()]
    }

    /// Invoked with each broker (or, for outbound, external) reply as it
    /// arrives. Default: ignores it.
    fn handle_feedback(&self, _feedback: &[u8]) {}

    /// Computes the single payload sent back on the external socket (for
    /// an inbound component that expects a reply) once its scatter loop
    /// finishes, or back to the broker (for an outbound component,
    /// doubling as its next availability signal). Default: an empty
    /// payload.
    fn reply_feedback(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// The no-op hook set: scatter-once, ignore feedback, reply empty —
/// exactly the original base classes' behavior before any subclass
/// override.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl ComponentHooks for DefaultHooks {}

/// The default hook set for reply-expecting inbound components
/// (`RepService`/`RepConnection`): the external reply forwards whatever
/// the broker handed back. The broker's own normal-routing ack is the
/// internal control byte `b"1"` (§4.1); at the external boundary that is
/// surfaced as `b"0"` (the "accepted, proceed" signal used throughout
/// §7's degenerate replies), matching S2. A self-reply echo (S1) is not
/// `b"1"` and passes through unchanged.
#[derive(Debug, Default)]
pub struct EchoHooks {
    last: std::sync::Mutex<Vec<u8>>,
}

impl ComponentHooks for EchoHooks {
    fn handle_feedback(&self, feedback: &[u8]) {
        *self.last.lock().expect("echo hook mutex poisoned") = feedback.to_vec();
    }

    fn reply_feedback(&self) -> Vec<u8> {
        let last = self.last.lock().expect("echo hook mutex poisoned");
        if last.as_slice() == b"1" {
            b"0".to_vec()
        } else {
            last.clone()
        }
    }
}
