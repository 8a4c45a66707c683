use std::path::Path;
use std::sync::Arc;

use crate::error::UnitError;
use crate::graph::GraphStorePlugin;

use super::layout::{file_label, files_matching, DataLayout};
use super::unit::UnitProgress;

async fn index_one(store: &dyn GraphStorePlugin, path: &Path) -> Result<(), UnitError> {
    let name = file_label(path);
    let text = tokio::fs::read_to_string(path).await?;
    let record: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| UnitError::InvalidRecord {
            file: name.clone(),
            message: e.to_string(),
        })?;
    if record.is_null() {
        return Err(UnitError::EmptyRecord(name));
    }

    store
        .store(&record)
        .await
        .map_err(|cause| UnitError::Store { file: name, cause })
}

/// Load every JSON record of one envelope into the graph store.
pub async fn index_envelope(
    store: Arc<dyn GraphStorePlugin>,
    layout: Arc<DataLayout>,
    unit: UnitProgress,
) -> Result<Vec<String>, UnitError> {
    let envelope_id = unit.envelope_id().to_string();
    let records = files_matching(&layout.output_dir(&envelope_id), "*.json")?;

    unit.start(records.len()).await;

    let mut stored = Vec::with_capacity(records.len());
    let mut first_error = None;
    for path in &records {
        let label = file_label(path);
        match index_one(store.as_ref(), path).await {
            Ok(()) => {
                unit.advance(&label).await;
                stored.push(label);
            }
            Err(err) => {
                tracing::warn!(
                    target: "docflow.pipeline",
                    envelope_id = %envelope_id,
                    file = %label,
                    error = %err,
                    "record indexing failed"
                );
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(stored),
    }
}
