//! Bridges ordinary `tracing` events into the [`crate::collectors::LogCollector`]
//! side channel, so the functional log component and the ambient
//! structured-logging stack are the same facility rather than two
//! parallel systems.

use crossbeam::channel::Sender;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::domain_types::ComponentName;
use crate::transport::Frame;

/// Captures the `message` field of a tracing event as a plain string,
/// mirroring the formatted line the original's `PushHandler` sends.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// A `tracing_subscriber::Layer` that forwards every event at or above
/// `level` to a bypass channel, the way `PushHandler.emit` forwards
/// formatted log records over a `PushBypassConnection`.
pub struct LogBridgeLayer {
    sender: Sender<Frame>,
    source: ComponentName,
    level: tracing::Level,
}

impl LogBridgeLayer {
    /// Builds a bridge forwarding events at or above `level` from `source`
    /// onto `sender` (typically connected to a [`crate::collectors::LogCollector`]).
    #[must_use]
    pub fn new(sender: Sender<Frame>, source: ComponentName, level: tracing::Level) -> Self {
        Self {
            sender,
            source,
            level,
        }
    }
}

impl<S> Layer<S> for LogBridgeLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > self.level {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let line = format!(
            "{level} {target} - {message}",
            level = event.metadata().level(),
            target = event.metadata().target(),
            message = visitor.message.unwrap_or_default(),
        );
        // Best-effort: a full bypass channel drops the log line rather
        // than blocking the emitting thread (§4.7 "no reliability - drops
        // permitted under backpressure").
        let _ = self.sender.try_send(Frame::new(self.source.clone(), line.into_bytes()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use tracing_subscriber::prelude::*;

    #[test]
    fn bridge_forwards_event_message_as_a_frame() {
        let (tx, rx) = unbounded();
        let layer = LogBridgeLayer::new(
            tx,
            ComponentName::try_new("test".to_string()).unwrap(),
            tracing::Level::INFO,
        );
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("hello from bridge");
        });
        let frame = rx.try_recv().expect("a frame should have been forwarded");
        let text = String::from_utf8(frame.payload).unwrap();
        assert!(text.contains("hello from bridge"));
    }
}
