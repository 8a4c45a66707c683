use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::NotificationSink;
use crate::progress::ProgressMessage;

/// Records every message in arrival order.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<ProgressMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<ProgressMessage>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn messages(&self) -> Vec<ProgressMessage> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn take(&self) -> Vec<ProgressMessage> {
        std::mem::take(&mut *self.guard())
    }

    /// Messages rendered as JSON lines.
    pub fn to_json_lines(&self) -> Vec<String> {
        self.guard()
            .iter()
            .filter_map(|m| serde_json::to_string(m).ok())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, message: &ProgressMessage) -> bool {
        self.guard().push(message.clone());
        true
    }
}
