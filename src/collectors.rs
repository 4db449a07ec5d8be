//! Side-channel collectors and emitters (§4.7): fire-and-forget
//! push/pull pairs that bypass the broker entirely.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender};
use dashmap::DashMap;

use crate::domain_types::ComponentName;
use crate::shutdown::LoopBudget;
use crate::transport::Frame;

/// Endpoint for log collection: counts received frames and emits a
/// `tracing::info!` event per frame, carrying forward the original's
/// running-count-plus-print `emit` behavior onto the ambient logging
/// stack.
pub struct LogCollector {
    inbox: Receiver<Frame>,
    received: AtomicU64,
    budget: LoopBudget,
}

impl LogCollector {
    /// Builds a collector bound to `inbox`.
    #[must_use]
    pub fn new(inbox: Receiver<Frame>, budget: LoopBudget) -> Self {
        Self {
            inbox,
            received: AtomicU64::new(0),
            budget,
        }
    }

    /// Total frames received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    fn emit(&self, frame: &Frame) {
        let count = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        let text = String::from_utf8_lossy(&frame.payload);
        tracing::info!(log_entry = count, source = %frame.peer, "{text}");
    }

    /// Runs the receive/emit loop until the budget is exhausted.
    pub fn start(&self) {
        let mut completed = 0usize;
        loop {
            if self.budget.should_stop(completed) {
                break;
            }
            let frame = crossbeam::channel::select! {
                recv(self.inbox) -> msg => match msg {
                    Ok(frame) => frame,
                    Err(_) => break,
                },
                recv(self.budget.shutdown().closed_channel()) -> _ => break,
            };
            self.emit(&frame);
            completed += 1;
        }
    }
}

/// Endpoint for performance-tick collection, structurally identical to
/// [`LogCollector`] but kept as its own type the way the original keeps
/// `PerformanceCollector` separate from `LogCollector`.
pub struct PerformanceCollector {
    inbox: Receiver<Frame>,
    received: AtomicU64,
    budget: LoopBudget,
}

impl PerformanceCollector {
    /// Builds a collector bound to `inbox`.
    #[must_use]
    pub fn new(inbox: Receiver<Frame>, budget: LoopBudget) -> Self {
        Self {
            inbox,
            received: AtomicU64::new(0),
            budget,
        }
    }

    /// Total ticks received so far.
    #[must_use]
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    fn emit(&self, frame: &Frame) {
        let count = self.received.fetch_add(1, Ordering::Relaxed) + 1;
        let text = String::from_utf8_lossy(&frame.payload);
        tracing::info!(tick = count, source = %frame.peer, "{text}");
    }

    /// Runs the receive/emit loop until the budget is exhausted.
    pub fn start(&self) {
        let mut completed = 0usize;
        loop {
            if self.budget.should_stop(completed) {
                break;
            }
            let frame = crossbeam::channel::select! {
                recv(self.inbox) -> msg => match msg {
                    Ok(frame) => frame,
                    Err(_) => break,
                },
                recv(self.budget.shutdown().closed_channel()) -> _ => break,
            };
            self.emit(&frame);
            completed += 1;
        }
    }
}

/// Emits the literal `b"ping"` every `every` seconds from a dedicated
/// thread (§4.7).
pub struct Pinger {
    name: ComponentName,
    outbox: Sender<Frame>,
    every: Duration,
}

impl Pinger {
    /// Builds a pinger sending on `outbox` every `every` seconds.
    #[must_use]
    pub fn new(name: ComponentName, outbox: Sender<Frame>, every: Duration) -> Self {
        Self { name, outbox, every }
    }

    /// Runs the ping loop until `pings` heartbeats have been sent or the
    /// channel closes, sleeping `every` between each.
    pub fn start(&self, pings: usize) {
        for _ in 0..pings {
            thread::sleep(self.every);
            if self.outbox.send(Frame::new(self.name.clone(), b"ping".to_vec())).is_err() {
                break;
            }
        }
    }
}

/// Records and sends performance counters to an external service:
/// per-label monotonically increasing loop counters paired with elapsed
/// seconds since construction, exactly as the original's `tick_db`.
pub struct PerformanceCounter {
    name: ComponentName,
    outbox: Sender<Frame>,
    zero: Instant,
    tick_db: DashMap<String, u64>,
}

impl PerformanceCounter {
    /// Builds a performance counter sending on `outbox`.
    #[must_use]
    pub fn new(name: ComponentName, outbox: Sender<Frame>) -> Self {
        Self {
            name,
            outbox,
            zero: Instant::now(),
            tick_db: DashMap::new(),
        }
    }

    fn next_loop(&self, label: &str) -> u64 {
        let mut entry = self.tick_db.entry(label.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Records a tick for `label` and sends
    /// `"{label}: #{loop}: {elapsed_seconds}"` on the outbox.
    pub fn tick(&self, label: &str) {
        let loop_count = self.next_loop(label);
        let elapsed = self.zero.elapsed().as_secs_f64();
        let message = format!("{label}: #{loop_count}: {elapsed}");
        let _ = self.outbox.send(Frame::new(self.name.clone(), message.into_bytes()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::MessageCap;
    use crate::shutdown::ShutdownSignal;

    fn name(s: &str) -> ComponentName {
        ComponentName::try_new(s.to_string()).unwrap()
    }

    #[test]
    fn log_collector_counts_received_frames() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let collector = LogCollector::new(rx, LoopBudget::capped(MessageCap::new(2), ShutdownSignal::never()));
        tx.send(Frame::new(name("a"), b"one".to_vec())).unwrap();
        tx.send(Frame::new(name("a"), b"two".to_vec())).unwrap();
        collector.start();
        assert_eq!(collector.received(), 2);
    }

    #[test]
    fn performance_counter_increments_per_label() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let counter = PerformanceCounter::new(name("perf"), tx);
        counter.tick("stage-a");
        counter.tick("stage-a");
        counter.tick("stage-b");
        drop(counter);
        let lines: Vec<String> = rx
            .try_iter()
            .map(|f| String::from_utf8(f.payload).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("stage-a: #1:"));
        assert!(lines[1].starts_with("stage-a: #2:"));
        assert!(lines[2].starts_with("stage-b: #1:"));
    }
}
