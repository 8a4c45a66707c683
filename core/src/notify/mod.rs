//! Progress notification fan-out.
//!
//! Trackers hand every [`ProgressMessage`] to a [`Notifier`], which forwards it to each
//! configured [`NotificationSink`]. Delivery is best-effort: a sink reports failure with
//! `false`, the notifier logs it and moves on. An empty notifier is a silent no-op, so
//! tracking state is maintained even when nothing listens.

pub mod events;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::progress::ProgressMessage;

pub use events::EventsOutSink;
pub use memory::MemorySink;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver one message. Returns `false` when delivery failed; never errors.
    async fn send(&self, message: &ProgressMessage) -> bool;
}

#[derive(Clone, Default)]
pub struct Notifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.name().to_string()).collect()
    }

    pub async fn emit(&self, message: &ProgressMessage) {
        for sink in &self.sinks {
            if !sink.send(message).await {
                tracing::warn!(
                    target: "docflow.notify",
                    sink = %sink.name(),
                    status = %message.status(),
                    envelope_id = ?message.envelope_id(),
                    "notification delivery failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Phase;

    struct RejectingSink;

    #[async_trait]
    impl NotificationSink for RejectingSink {
        fn name(&self) -> &str {
            "rejecting"
        }

        async fn send(&self, _message: &ProgressMessage) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn failed_sink_does_not_block_others() {
        let memory = Arc::new(MemorySink::new());
        let notifier = Notifier::new()
            .with_sink(Arc::new(RejectingSink))
            .with_sink(memory.clone());

        notifier
            .emit(&ProgressMessage::Started {
                envelope_id: "e1".into(),
                total_items: 1,
                phase: Phase::Download,
            })
            .await;

        assert_eq!(memory.len(), 1);
        assert_eq!(notifier.sink_names(), vec!["rejecting", "memory"]);
    }

    #[tokio::test]
    async fn empty_notifier_is_noop() {
        let notifier = Notifier::new();
        assert!(notifier.is_empty());
        notifier.emit(&ProgressMessage::Terminate).await;
    }
}
