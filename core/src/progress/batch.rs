use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::message::{
    percentage, CurrentEnvelope, EnvelopeStatus, EnvelopeStatusInfo, OverallProgress, Phase,
    ProgressMessage,
};
use crate::notify::Notifier;

/// Phase-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchState {
    pub total_envelopes: usize,
    pub completed_envelopes: usize,
    pub total_items: usize,
    pub completed_items: usize,
    pub envelope_statuses: BTreeMap<String, EnvelopeStatusInfo>,
}

impl BatchState {
    pub fn overall(&self) -> OverallProgress {
        OverallProgress {
            completed_envelopes: self.completed_envelopes,
            total_envelopes: self.total_envelopes,
            completed_items: self.completed_items,
            total_items: self.total_items,
            percentage: percentage(self.completed_items, self.total_items),
        }
    }

    pub fn is_drained(&self) -> bool {
        self.completed_envelopes == self.total_envelopes
    }

    pub fn envelopes_with(&self, status: EnvelopeStatus) -> Vec<String> {
        self.envelope_statuses
            .iter()
            .filter(|(_, info)| info.status == status)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn failed_envelopes(&self) -> usize {
        self.envelope_statuses
            .values()
            .filter(|info| info.status == EnvelopeStatus::Failed)
            .count()
    }
}

/// Batch-wide progress for one phase, plus the phase's completion barrier.
///
/// `total_envelopes` is fixed at construction. Every envelope must be reported
/// exactly once through [`complete`](Self::complete) or [`fail`](Self::fail);
/// when the count reaches the total, `BatchCompleted` is emitted and
/// [`wait_drained`](Self::wait_drained) releases.
pub struct BatchAggregator {
    phase: Phase,
    notifier: Notifier,
    state: Mutex<BatchState>,
    drained: watch::Sender<bool>,
}

impl BatchAggregator {
    pub fn new(phase: Phase, total_envelopes: usize, notifier: Notifier) -> Self {
        let (drained, _) = watch::channel(total_envelopes == 0);
        Self {
            phase,
            notifier,
            state: Mutex::new(BatchState {
                total_envelopes,
                ..BatchState::default()
            }),
            drained,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn guard(&self) -> MutexGuard<'_, BatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add (or replace) an envelope's entry and grow the item total.
    pub async fn register(&self, envelope_id: &str, total_items: usize) {
        let message = {
            let mut state = self.guard();
            if let Some(previous) = state.envelope_statuses.get(envelope_id) {
                if previous.status.is_terminal() {
                    tracing::warn!(
                        target: "docflow.progress",
                        envelope_id = %envelope_id,
                        phase = %self.phase,
                        "register after envelope finished; ignored"
                    );
                    return;
                }
                let (prev_total, prev_done) = (previous.total_items, previous.completed_items);
                state.total_items -= prev_total;
                state.completed_items -= prev_done;
            }
            state
                .envelope_statuses
                .insert(envelope_id.to_string(), EnvelopeStatusInfo::pending(total_items));
            state.total_items += total_items;
            self.batch_progress(&state, None)
        };
        self.notifier.emit(&message).await;
    }

    /// Count one more item for `envelope_id`.
    pub async fn update(&self, envelope_id: &str, item_label: &str) -> bool {
        let message = {
            let mut state = self.guard();
            let Some(info) = state.envelope_statuses.get_mut(envelope_id) else {
                tracing::warn!(
                    target: "docflow.progress",
                    envelope_id = %envelope_id,
                    phase = %self.phase,
                    "update for unregistered envelope"
                );
                return false;
            };
            if info.status.is_terminal() || info.completed_items >= info.total_items {
                tracing::warn!(
                    target: "docflow.progress",
                    envelope_id = %envelope_id,
                    phase = %self.phase,
                    "update rejected"
                );
                return false;
            }
            info.completed_items += 1;
            let current = CurrentEnvelope {
                id: envelope_id.to_string(),
                current_item: item_label.to_string(),
                completed: info.completed_items,
                total: info.total_items,
            };
            state.completed_items += 1;
            self.batch_progress(&state, Some(current))
        };
        self.notifier.emit(&message).await;
        true
    }

    pub async fn complete(&self, envelope_id: &str) -> bool {
        self.finish(envelope_id, EnvelopeStatus::Completed).await
    }

    /// Account a failed envelope; counts toward completion like `complete`.
    pub async fn fail(&self, envelope_id: &str) -> bool {
        self.finish(envelope_id, EnvelopeStatus::Failed).await
    }

    async fn finish(&self, envelope_id: &str, to: EnvelopeStatus) -> bool {
        let (message, drained) = {
            let mut state = self.guard();
            if state.is_drained() {
                tracing::warn!(
                    target: "docflow.progress",
                    envelope_id = %envelope_id,
                    phase = %self.phase,
                    "batch already complete; extra terminal report ignored"
                );
                return false;
            }
            let info = state
                .envelope_statuses
                .entry(envelope_id.to_string())
                .or_insert_with(|| EnvelopeStatusInfo::pending(0));
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
            state.completed_envelopes += 1;

            if state.is_drained() {
                let message = ProgressMessage::BatchCompleted {
                    overall: state.overall(),
                    envelope_statuses: state.envelope_statuses.clone(),
                    phase: self.phase,
                };
                (message, true)
            } else {
                (self.batch_progress(&state, None), false)
            }
        };

        self.notifier.emit(&message).await;
        if drained {
            tracing::info!(
                target: "docflow.progress",
                phase = %self.phase,
                "batch drained"
            );
            self.drained.send_replace(true);
        }
        true
    }

    fn batch_progress(
        &self,
        state: &BatchState,
        current_envelope: Option<CurrentEnvelope>,
    ) -> ProgressMessage {
        ProgressMessage::BatchProgress {
            overall: state.overall(),
            current_envelope,
            envelope_statuses: state.envelope_statuses.clone(),
            phase: self.phase,
        }
    }

    /// Resolves once every expected envelope has been reported terminal.
    pub async fn wait_drained(&self) {
        let mut rx = self.drained.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|drained| *drained).await;
    }

    pub fn is_drained(&self) -> bool {
        *self.drained.borrow()
    }

    pub fn snapshot(&self) -> BatchState {
        self.guard().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemorySink;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn aggregator(total: usize) -> (Arc<BatchAggregator>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let notifier = Notifier::new().with_sink(sink.clone());
        (
            Arc::new(BatchAggregator::new(Phase::Download, total, notifier)),
            sink,
        )
    }

    #[tokio::test]
    async fn zero_envelopes_is_pre_drained() {
        let (batch, sink) = aggregator(0);
        assert!(batch.is_drained());
        tokio::time::timeout(Duration::from_millis(100), batch.wait_drained())
            .await
            .expect("barrier should already be satisfied");
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn register_overwrite_replaces_totals() {
        let (batch, _sink) = aggregator(1);
        batch.register("e1", 3).await;
        batch.update("e1", "a").await;
        batch.register("e1", 5).await;

        let state = batch.snapshot();
        assert_eq!(state.total_items, 5);
        assert_eq!(state.completed_items, 0);
        assert_eq!(state.envelope_statuses["e1"], EnvelopeStatusInfo::pending(5));
    }

    #[tokio::test]
    async fn update_carries_current_envelope() {
        let (batch, sink) = aggregator(2);
        batch.register("e1", 2).await;
        batch.register("e2", 1).await;
        assert!(batch.update("e1", "doc.pdf").await);

        let last = sink.messages().pop().unwrap();
        match last {
            ProgressMessage::BatchProgress {
                overall,
                current_envelope,
                ..
            } => {
                assert_eq!(overall.completed_items, 1);
                assert_eq!(overall.total_items, 3);
                assert_eq!(overall.percentage, 33.33);
                let current = current_envelope.unwrap();
                assert_eq!(current.id, "e1");
                assert_eq!(current.current_item, "doc.pdf");
                assert_eq!((current.completed, current.total), (1, 2));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_is_bounded_by_total() {
        let (batch, _sink) = aggregator(1);
        batch.register("e1", 1).await;
        assert!(batch.update("e1", "a").await);
        assert!(!batch.update("e1", "b").await);
        assert!(!batch.update("nope", "c").await);
        let state = batch.snapshot();
        assert_eq!((state.completed_items, state.total_items), (1, 1));
    }

    #[tokio::test]
    async fn single_batch_completed_after_last_terminal() {
        let (batch, sink) = aggregator(3);
        for id in ["a", "b", "c"] {
            batch.register(id, 1).await;
        }
        batch.complete("a").await;
        batch.fail("b").await;
        assert!(!batch.is_drained());
        batch.complete("c").await;

        assert!(batch.is_drained());
        let completed: Vec<_> = sink
            .messages()
            .into_iter()
            .filter(|m| m.status() == "batch_completed")
            .collect();
        assert_eq!(completed.len(), 1);

        let state = batch.snapshot();
        assert_eq!(state.completed_envelopes, 3);
        assert_eq!(state.failed_envelopes(), 1);
        assert_eq!(state.envelopes_with(EnvelopeStatus::Completed), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn second_terminal_call_is_ignored() {
        let (batch, _sink) = aggregator(2);
        batch.register("a", 0).await;
        batch.register("b", 0).await;
        assert!(batch.complete("a").await);
        assert!(!batch.complete("a").await);
        assert!(!batch.fail("a").await);
        assert_eq!(batch.snapshot().completed_envelopes, 1);
        assert!(!batch.is_drained());
    }

    #[tokio::test]
    async fn fail_before_register_is_accounted() {
        let (batch, _sink) = aggregator(1);
        assert!(batch.fail("early").await);
        assert!(batch.is_drained());
        let state = batch.snapshot();
        assert_eq!(state.envelope_statuses["early"].status, EnvelopeStatus::Failed);
        assert!(!batch.complete("stray").await);
        assert_eq!(state.completed_envelopes, 1);
    }

    #[tokio::test]
    async fn barrier_releases_concurrent_waiters() {
        let (batch, _sink) = aggregator(2);
        batch.register("a", 0).await;
        batch.register("b", 0).await;

        let waiter = {
            let batch = batch.clone();
            tokio::spawn(async move { batch.wait_drained().await })
        };

        batch.complete("a").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        batch.complete("b").await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("barrier should release")
            .unwrap();
    }
}
