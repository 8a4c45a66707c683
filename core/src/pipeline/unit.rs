use std::sync::Arc;

use crate::error::UnitError;
use crate::notify::Notifier;
use crate::progress::{BatchAggregator, EnvelopeStatus, EnvelopeTracker, Phase};

use super::report::UnitOutcome;

/// The two trackers of one phase, always driven together.
pub struct PhaseProgress {
    tracker: EnvelopeTracker,
    batch: BatchAggregator,
}

impl PhaseProgress {
    pub fn new(phase: Phase, total_envelopes: usize, notifier: Notifier) -> Self {
        Self {
            tracker: EnvelopeTracker::new(phase, notifier.clone()),
            batch: BatchAggregator::new(phase, total_envelopes, notifier),
        }
    }

    pub fn phase(&self) -> Phase {
        self.tracker.phase()
    }

    pub fn tracker(&self) -> &EnvelopeTracker {
        &self.tracker
    }

    pub fn batch(&self) -> &BatchAggregator {
        &self.batch
    }
}

/// Progress handle given to a running unit. It can start and advance its
/// envelope but cannot finish it; only the executor does that.
#[derive(Clone)]
pub struct UnitProgress {
    envelope_id: Arc<str>,
    progress: Arc<PhaseProgress>,
}

impl UnitProgress {
    pub fn envelope_id(&self) -> &str {
        &self.envelope_id
    }

    pub fn phase(&self) -> Phase {
        self.progress.phase()
    }

    pub async fn start(&self, total_items: usize) {
        self.progress
            .tracker
            .start(&self.envelope_id, total_items)
            .await;
        self.progress
            .batch
            .register(&self.envelope_id, total_items)
            .await;
    }

    pub async fn advance(&self, item_label: &str) -> bool {
        let accepted = self
            .progress
            .tracker
            .advance(&self.envelope_id, item_label)
            .await;
        if accepted {
            self.progress
                .batch
                .update(&self.envelope_id, item_label)
                .await;
        }
        accepted
    }
}

/// Executor-side owner of a unit's terminal outcome.
pub struct UnitReporter {
    handle: UnitProgress,
}

impl UnitReporter {
    pub fn new(envelope_id: &str, progress: Arc<PhaseProgress>) -> Self {
        Self {
            handle: UnitProgress {
                envelope_id: Arc::from(envelope_id),
                progress,
            },
        }
    }

    pub fn handle(&self) -> UnitProgress {
        self.handle.clone()
    }

    /// Mirror the outcome into both trackers. Consumes the reporter so an
    /// envelope can only be finished once.
    pub async fn finish(self, outcome: Result<Vec<String>, UnitError>) -> UnitOutcome {
        let envelope_id = self.handle.envelope_id.to_string();
        let progress = &self.handle.progress;
        let phase = progress.phase();

        match outcome {
            Ok(files) => {
                tracing::info!(
                    target: "docflow.pipeline",
                    envelope_id = %envelope_id,
                    phase = %phase,
                    files = files.len(),
                    "unit completed"
                );
                progress.tracker.complete(&envelope_id, files.clone()).await;
                progress.batch.complete(&envelope_id).await;
                UnitOutcome {
                    envelope_id,
                    status: EnvelopeStatus::Completed,
                    files,
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(
                    target: "docflow.pipeline",
                    envelope_id = %envelope_id,
                    phase = %phase,
                    kind = err.kind(),
                    error = %err,
                    "unit failed"
                );
                let reason = err.to_string();
                progress.tracker.fail(&envelope_id, &reason).await;
                progress.batch.fail(&envelope_id).await;
                UnitOutcome {
                    envelope_id,
                    status: EnvelopeStatus::Failed,
                    files: Vec::new(),
                    error: Some(reason),
                }
            }
        }
    }
}
