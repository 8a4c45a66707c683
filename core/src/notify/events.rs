use async_trait::async_trait;

use super::NotificationSink;
use crate::events_out::{write_progress_event, EventsOutTx};
use crate::progress::ProgressMessage;

/// Mirrors every message into the events-out JSONL stream.
pub struct EventsOutSink {
    out: EventsOutTx,
}

impl EventsOutSink {
    pub fn new(out: EventsOutTx) -> Self {
        Self { out }
    }
}

#[async_trait]
impl NotificationSink for EventsOutSink {
    fn name(&self) -> &str {
        "events_out"
    }

    async fn send(&self, message: &ProgressMessage) -> bool {
        let before = self.out.dropped_count();
        write_progress_event(Some(&self.out), message).await;
        self.out.dropped_count() == before
    }
}
