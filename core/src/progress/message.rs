use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Pipeline phase a message (and its trackers) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "download")]
    Download,
    #[serde(rename = "pdf_to_json")]
    Convert,
    #[serde(rename = "json_to_graph")]
    Index,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Download, Phase::Convert, Phase::Index];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Download => "download",
            Phase::Convert => "pdf_to_json",
            Phase::Index => "json_to_graph",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Pending,
    Completed,
    Failed,
}

impl EnvelopeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EnvelopeStatus::Pending)
    }
}

/// Per-envelope counters shared by the tracker and the batch aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeStatusInfo {
    #[serde(rename = "total_documents")]
    pub total_items: usize,
    #[serde(rename = "completed_documents")]
    pub completed_items: usize,
    pub status: EnvelopeStatus,
}

impl EnvelopeStatusInfo {
    pub fn pending(total_items: usize) -> Self {
        Self {
            total_items,
            completed_items: 0,
            status: EnvelopeStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProgress {
    #[serde(rename = "current_document")]
    pub current_item: String,
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallProgress {
    pub completed_envelopes: usize,
    pub total_envelopes: usize,
    #[serde(rename = "completed_documents")]
    pub completed_items: usize,
    #[serde(rename = "total_documents")]
    pub total_items: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentEnvelope {
    pub id: String,
    #[serde(rename = "current_document")]
    pub current_item: String,
    pub completed: usize,
    pub total: usize,
}

/// Every notification the pipeline can emit.
///
/// Serialization produces the flat JSON shape progress observers consume:
/// a `type` discriminator (`individual`, `batch`, `terminate`), a `status`
/// and the variant fields. `Terminate` carries no phase.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    Started {
        envelope_id: String,
        total_items: usize,
        phase: Phase,
    },
    Progress {
        envelope_id: String,
        progress: ItemProgress,
        phase: Phase,
    },
    Completed {
        envelope_id: String,
        files: Vec<String>,
        phase: Phase,
    },
    Error {
        envelope_id: String,
        error: String,
        phase: Phase,
    },
    BatchProgress {
        overall: OverallProgress,
        current_envelope: Option<CurrentEnvelope>,
        envelope_statuses: BTreeMap<String, EnvelopeStatusInfo>,
        phase: Phase,
    },
    BatchCompleted {
        overall: OverallProgress,
        envelope_statuses: BTreeMap<String, EnvelopeStatusInfo>,
        phase: Phase,
    },
    Terminate,
}

impl ProgressMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressMessage::Started { .. }
            | ProgressMessage::Progress { .. }
            | ProgressMessage::Completed { .. }
            | ProgressMessage::Error { .. } => "individual",
            ProgressMessage::BatchProgress { .. } | ProgressMessage::BatchCompleted { .. } => {
                "batch"
            }
            ProgressMessage::Terminate => "terminate",
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            ProgressMessage::Started { .. } => "started",
            ProgressMessage::Progress { .. } => "in_progress",
            ProgressMessage::Completed { .. } => "completed",
            ProgressMessage::Error { .. } => "error",
            ProgressMessage::BatchProgress { .. } => "batch_progress",
            ProgressMessage::BatchCompleted { .. } => "batch_completed",
            ProgressMessage::Terminate => "terminated",
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            ProgressMessage::Started { phase, .. }
            | ProgressMessage::Progress { phase, .. }
            | ProgressMessage::Completed { phase, .. }
            | ProgressMessage::Error { phase, .. }
            | ProgressMessage::BatchProgress { phase, .. }
            | ProgressMessage::BatchCompleted { phase, .. } => Some(*phase),
            ProgressMessage::Terminate => None,
        }
    }

    pub fn envelope_id(&self) -> Option<&str> {
        match self {
            ProgressMessage::Started { envelope_id, .. }
            | ProgressMessage::Progress { envelope_id, .. }
            | ProgressMessage::Completed { envelope_id, .. }
            | ProgressMessage::Error { envelope_id, .. } => Some(envelope_id),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for ProgressMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind())?;
        map.serialize_entry("status", self.status())?;

        match self {
            ProgressMessage::Started {
                envelope_id,
                total_items,
                ..
            } => {
                map.serialize_entry("envelope_id", envelope_id)?;
                map.serialize_entry("total_documents", total_items)?;
            }
            ProgressMessage::Progress {
                envelope_id,
                progress,
                ..
            } => {
                map.serialize_entry("envelope_id", envelope_id)?;
                map.serialize_entry("progress", progress)?;
            }
            ProgressMessage::Completed {
                envelope_id, files, ..
            } => {
                map.serialize_entry("envelope_id", envelope_id)?;
                map.serialize_entry("files", files)?;
            }
            ProgressMessage::Error {
                envelope_id, error, ..
            } => {
                map.serialize_entry("envelope_id", envelope_id)?;
                map.serialize_entry("error", error)?;
            }
            ProgressMessage::BatchProgress {
                overall,
                current_envelope,
                envelope_statuses,
                ..
            } => {
                map.serialize_entry("overall_progress", overall)?;
                if let Some(current) = current_envelope {
                    map.serialize_entry("current_envelope", current)?;
                }
                map.serialize_entry("envelope_statuses", envelope_statuses)?;
            }
            ProgressMessage::BatchCompleted {
                overall,
                envelope_statuses,
                ..
            } => {
                map.serialize_entry("overall_progress", overall)?;
                map.serialize_entry("envelope_statuses", envelope_statuses)?;
            }
            ProgressMessage::Terminate => {
                map.serialize_entry("terminate", &true)?;
            }
        }

        if let Some(phase) = self.phase() {
            map.serialize_entry("phase", &phase)?;
        }
        map.end()
    }
}

/// `completed / total * 100` rounded to two decimals; 0 when `total` is 0.
pub fn percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = completed as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
