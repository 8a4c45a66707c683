use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::progress::{BatchState, EnvelopeStatus, Phase};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitOutcome {
    pub envelope_id: String,
    pub status: EnvelopeStatus,
    pub files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub skipped: bool,
    pub state: BatchState,
    pub units: Vec<UnitOutcome>,
    pub duration_ms: u64,
}

impl PhaseReport {
    pub fn skipped(phase: Phase) -> Self {
        Self {
            phase,
            skipped: true,
            state: BatchState::default(),
            units: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Envelopes that completed this phase, in id order.
    pub fn completed_ids(&self) -> Vec<String> {
        self.state.envelopes_with(EnvelopeStatus::Completed)
    }

    pub fn failed_ids(&self) -> Vec<String> {
        self.state.envelopes_with(EnvelopeStatus::Failed)
    }
}

/// Summary of one batch run, returned after Terminate has been sent.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub envelopes_discovered: usize,
    pub phases: Vec<PhaseReport>,
    /// Failures of the post-index steps (index build, embeddings).
    pub post_index_errors: Vec<String>,
}

impl BatchReport {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            envelopes_discovered: 0,
            phases: Vec::new(),
            post_index_errors: Vec::new(),
        }
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn failed_envelopes(&self) -> usize {
        self.phases.iter().map(|p| p.state.failed_envelopes()).sum()
    }

    /// True when no envelope failed in any phase and the post-index steps succeeded.
    pub fn is_success(&self) -> bool {
        self.failed_envelopes() == 0 && self.post_index_errors.is_empty()
    }
}
