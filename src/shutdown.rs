//! Cooperative cancellation primitive (§5: "There is no cooperative
//! cancellation channel in the core; shutdown is by process exit. An
//! implementation should add a context/cancellation signal that closes
//! the component's sockets, which unblocks the loop.") and the
//! finite-iteration test harness that stands in for it deterministically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{self, Receiver, Sender};

use crate::domain_types::MessageCap;

/// A cloneable shutdown flag plus a close-on-drop channel every component
/// loop selects on alongside its sockets. Dropping the last
/// [`ShutdownHandle`] (or calling [`ShutdownHandle::trigger`]) unblocks any
/// `recv` a component is parked in.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
    closed: Receiver<()>,
}

/// The construction-time counterpart of [`ShutdownSignal`] that actually
/// triggers shutdown.
#[derive(Debug)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    _closer: Sender<()>,
}

impl ShutdownHandle {
    /// Signals shutdown: sets the flag and drops the sender side, which
    /// closes every clone of the associated [`ShutdownSignal::closed`]
    /// channel and unblocks any pending `recv`.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl ShutdownSignal {
    /// Builds a fresh, untriggered shutdown signal and its trigger handle.
    #[must_use]
    pub fn new() -> (ShutdownHandle, Self) {
        let flag = Arc::new(AtomicBool::new(false));
        let (closer, closed) = channel::bounded(0);
        (
            ShutdownHandle {
                flag: flag.clone(),
                _closer: closer,
            },
            Self { flag, closed },
        )
    }

    /// A signal that is never triggered — the production default.
    #[must_use]
    pub fn never() -> Self {
        let (handle, signal) = Self::new();
        std::mem::forget(handle);
        signal
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// The receiver side component loops can fold into a
    /// `crossbeam::select!` alongside their sockets.
    #[must_use]
    pub fn closed_channel(&self) -> &Receiver<()> {
        &self.closed
    }
}

/// A finite-budget loop guard combining [`ShutdownSignal`] with a
/// [`MessageCap`], exactly as `RouterConfig::testing()` scales queues down
/// for deterministic tests: production code uses
/// [`LoopBudget::unbounded`], tests use [`LoopBudget::capped`].
#[derive(Debug, Clone)]
pub struct LoopBudget {
    cap: MessageCap,
    shutdown: ShutdownSignal,
}

impl LoopBudget {
    /// No cap, no shutdown signal — runs until the process exits.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            cap: MessageCap::unbounded(),
            shutdown: ShutdownSignal::never(),
        }
    }

    /// A budget bounded by `cap` iterations and cooperative shutdown.
    #[must_use]
    pub fn capped(cap: MessageCap, shutdown: ShutdownSignal) -> Self {
        Self { cap, shutdown }
    }

    /// Whether a loop reading this budget should stop before its next
    /// iteration, having completed `done` so far.
    #[must_use]
    pub fn should_stop(&self, done: usize) -> bool {
        self.cap.exhausted(done) || self.shutdown.is_triggered()
    }

    /// The underlying shutdown signal, for selecting alongside sockets.
    #[must_use]
    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}

impl Default for LoopBudget {
    fn default() -> Self {
        Self::unbounded()
    }
}
