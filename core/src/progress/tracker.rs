use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::message::{
    percentage, EnvelopeStatus, EnvelopeStatusInfo, ItemProgress, Phase, ProgressMessage,
};
use crate::notify::Notifier;

/// Per-envelope progress state machine for one phase.
///
/// Each envelope moves `Pending -> Completed` or `Pending -> Failed` exactly once.
/// State changes happen under the lock; the resulting message is emitted after
/// the lock is released.
pub struct EnvelopeTracker {
    phase: Phase,
    notifier: Notifier,
    envelopes: Mutex<HashMap<String, EnvelopeStatusInfo>>,
}

impl EnvelopeTracker {
    pub fn new(phase: Phase, notifier: Notifier) -> Self {
        Self {
            phase,
            notifier,
            envelopes: Mutex::new(HashMap::new()),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, EnvelopeStatusInfo>> {
        self.envelopes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Begin tracking `envelope_id`. A second start for the same id is ignored.
    pub async fn start(&self, envelope_id: &str, total_items: usize) {
        {
            let mut envelopes = self.guard();
            if envelopes.contains_key(envelope_id) {
                tracing::debug!(
                    target: "docflow.progress",
                    envelope_id = %envelope_id,
                    phase = %self.phase,
                    "envelope already started"
                );
                return;
            }
            envelopes.insert(
                envelope_id.to_string(),
                EnvelopeStatusInfo::pending(total_items),
            );
        }

        self.notifier
            .emit(&ProgressMessage::Started {
                envelope_id: envelope_id.to_string(),
                total_items,
                phase: self.phase,
            })
            .await;
    }

    /// Count one more item as done. Returns `false` if the call was rejected.
    pub async fn advance(&self, envelope_id: &str, item_label: &str) -> bool {
        let progress = {
            let mut envelopes = self.guard();
            let Some(info) = envelopes.get_mut(envelope_id) else {
                tracing::warn!(
                    target: "docflow.progress",
                    envelope_id = %envelope_id,
                    phase = %self.phase,
                    "advance for unknown envelope"
                );
                return false;
            };
            if info.status.is_terminal() || info.completed_items >= info.total_items {
                tracing::warn!(
                    target: "docflow.progress",
                    envelope_id = %envelope_id,
                    phase = %self.phase,
                    completed = info.completed_items,
                    total = info.total_items,
                    status = ?info.status,
                    "advance rejected"
                );
                return false;
            }
            info.completed_items += 1;
            ItemProgress {
                current_item: item_label.to_string(),
                completed: info.completed_items,
                total: info.total_items,
                percentage: percentage(info.completed_items, info.total_items),
            }
        };

        self.notifier
            .emit(&ProgressMessage::Progress {
                envelope_id: envelope_id.to_string(),
                progress,
                phase: self.phase,
            })
            .await;
        true
    }

    pub async fn complete(&self, envelope_id: &str, produced_items: Vec<String>) -> bool {
        if !self.transition(envelope_id, EnvelopeStatus::Completed) {
            return false;
        }
        self.notifier
            .emit(&ProgressMessage::Completed {
                envelope_id: envelope_id.to_string(),
                files: produced_items,
                phase: self.phase,
            })
            .await;
        true
    }

    /// Mark `envelope_id` failed. An id that was never started is registered
    /// with zero items first.
    pub async fn fail(&self, envelope_id: &str, reason: &str) -> bool {
        if !self.transition(envelope_id, EnvelopeStatus::Failed) {
            return false;
        }
        self.notifier
            .emit(&ProgressMessage::Error {
                envelope_id: envelope_id.to_string(),
                error: reason.to_string(),
                phase: self.phase,
            })
            .await;
        true
    }

    fn transition(&self, envelope_id: &str, to: EnvelopeStatus) -> bool {
        let mut envelopes = self.guard();
        if !envelopes.contains_key(envelope_id) {
            if to != EnvelopeStatus::Failed {
                tracing::warn!(
                    target: "docflow.progress",
                    envelope_id = %envelope_id,
                    phase = %self.phase,
                    "complete for unknown envelope"
                );
                return false;
            }
            envelopes.insert(envelope_id.to_string(), EnvelopeStatusInfo::pending(0));
        }
        let Some(info) = envelopes.get_mut(envelope_id) else {
            return false;
        };
        if info.status.is_terminal() {
            tracing::warn!(
                target: "docflow.progress",
                envelope_id = %envelope_id,
                phase = %self.phase,
                status = ?info.status,
                "envelope already finished"
            );
            return false;
        }
        info.status = to;
        true
    }

    pub fn snapshot(&self, envelope_id: &str) -> Option<EnvelopeStatusInfo> {
        self.guard().get(envelope_id).cloned()
    }

    pub fn snapshot_all(&self) -> BTreeMap<String, EnvelopeStatusInfo> {
        self.guard()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemorySink;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn tracker() -> (EnvelopeTracker, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let notifier = Notifier::new().with_sink(sink.clone());
        (EnvelopeTracker::new(Phase::Download, notifier), sink)
    }

    #[tokio::test]
    async fn full_lifecycle_emits_in_order() {
        let (tracker, sink) = tracker();
        tracker.start("e1", 3).await;
        assert!(tracker.advance("e1", "a.pdf").await);
        assert!(tracker.complete("e1", vec!["a.pdf".into()]).await);

        let statuses: Vec<&str> = sink.messages().iter().map(|m| m.status()).collect();
        assert_eq!(statuses, vec!["started", "in_progress", "completed"]);

        match &sink.messages()[1] {
            ProgressMessage::Progress { progress, .. } => {
                assert_eq!(progress.completed, 1);
                assert_eq!(progress.total, 3);
                assert_eq!(progress.percentage, 33.33);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(
            tracker.snapshot("e1").unwrap().status,
            EnvelopeStatus::Completed
        );
    }

    #[tokio::test]
    async fn duplicate_start_is_noop() {
        let (tracker, sink) = tracker();
        tracker.start("e1", 2).await;
        tracker.advance("e1", "x").await;
        tracker.start("e1", 5).await;

        let info = tracker.snapshot("e1").unwrap();
        assert_eq!(info.total_items, 2);
        assert_eq!(info.completed_items, 1);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn advance_never_exceeds_total() {
        let (tracker, _sink) = tracker();
        tracker.start("e1", 1).await;
        assert!(tracker.advance("e1", "x").await);
        assert!(!tracker.advance("e1", "y").await);
        assert!(!tracker.advance("missing", "z").await);
        assert_eq!(tracker.snapshot("e1").unwrap().completed_items, 1);
    }

    #[tokio::test]
    async fn terminal_status_is_final() {
        let (tracker, sink) = tracker();
        tracker.start("e1", 1).await;
        assert!(tracker.fail("e1", "boom").await);
        assert!(!tracker.complete("e1", vec![]).await);
        assert!(!tracker.fail("e1", "again").await);
        assert!(!tracker.advance("e1", "late").await);

        assert_eq!(tracker.snapshot("e1").unwrap().status, EnvelopeStatus::Failed);
        assert_eq!(sink.len(), 2);
    }

    #[tokio::test]
    async fn fail_registers_unknown_envelope() {
        let (tracker, sink) = tracker();
        assert!(tracker.fail("ghost", "listing failed").await);

        assert_eq!(
            tracker.snapshot("ghost"),
            Some(EnvelopeStatusInfo {
                total_items: 0,
                completed_items: 0,
                status: EnvelopeStatus::Failed,
            })
        );
        assert_eq!(
            sink.messages(),
            vec![ProgressMessage::Error {
                envelope_id: "ghost".into(),
                error: "listing failed".into(),
                phase: Phase::Download,
            }]
        );
    }

    #[tokio::test]
    async fn tracks_without_sink() {
        let tracker = EnvelopeTracker::new(Phase::Index, Notifier::new());
        tracker.start("e1", 2).await;
        tracker.advance("e1", "x").await;
        let all = tracker.snapshot_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all["e1"].completed_items, 1);
    }
}
