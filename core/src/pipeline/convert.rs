use std::path::Path;
use std::sync::Arc;

use crate::convert::ConverterPlugin;
use crate::error::UnitError;

use super::layout::{file_label, files_matching, DataLayout};
use super::unit::UnitProgress;

async fn convert_one(
    converter: &dyn ConverterPlugin,
    input: &Path,
    out_dir: &Path,
) -> Result<String, UnitError> {
    let name = file_label(input);
    let bytes = tokio::fs::read(input).await?;

    let record = converter
        .convert(bytes, &name)
        .await
        .map_err(|cause| UnitError::Convert {
            file: name.clone(),
            cause,
        })?
        .ok_or_else(|| UnitError::EmptyRecord(name.clone()))?;

    let text = serde_json::to_string_pretty(&record).map_err(|e| UnitError::InvalidRecord {
        file: name.clone(),
        message: e.to_string(),
    })?;

    let out_name = format!("{name}.json");
    tokio::fs::write(out_dir.join(&out_name), text).await?;
    Ok(out_name)
}

/// Convert each downloaded PDF of one envelope into a JSON record file.
///
/// A failed document is not counted; the remaining documents still run and
/// the envelope fails with the first error.
pub async fn convert_envelope(
    converter: Arc<dyn ConverterPlugin>,
    layout: Arc<DataLayout>,
    unit: UnitProgress,
) -> Result<Vec<String>, UnitError> {
    let envelope_id = unit.envelope_id().to_string();
    let inputs = files_matching(&layout.download_dir(&envelope_id), "*.pdf")?;

    unit.start(inputs.len()).await;

    let out_dir = layout.output_dir(&envelope_id);
    tokio::fs::create_dir_all(&out_dir).await?;

    let mut produced = Vec::with_capacity(inputs.len());
    let mut first_error = None;
    for input in &inputs {
        let label = file_label(input);
        match convert_one(converter.as_ref(), input, &out_dir).await {
            Ok(out_name) => {
                unit.advance(&label).await;
                produced.push(out_name);
            }
            Err(err) => {
                tracing::warn!(
                    target: "docflow.pipeline",
                    envelope_id = %envelope_id,
                    file = %label,
                    error = %err,
                    "document conversion failed"
                );
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(produced),
    }
}
