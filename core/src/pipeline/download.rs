use std::path::Path;
use std::sync::Arc;

use tempfile::TempPath;

use crate::error::UnitError;
use crate::source::{DocumentSourcePlugin, FetchedDocument};

use super::layout::DataLayout;
use super::unit::UnitProgress;

/// Move a scratch file into place; falls back to copy when the scratch file
/// lives on another filesystem. The scratch file is gone either way.
async fn persist_scratch(scratch: TempPath, dest: &Path) -> std::io::Result<()> {
    match scratch.persist(dest) {
        Ok(()) => Ok(()),
        Err(err) => {
            tokio::fs::copy(&*err.path, dest).await?;
            Ok(())
        }
    }
}

fn local_name(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// Download every document of one envelope into its download directory.
///
/// Documents whose destination already exists are not fetched again but still
/// count as progress. Any source or filesystem error fails the envelope.
pub async fn download_envelope(
    source: Arc<dyn DocumentSourcePlugin>,
    layout: Arc<DataLayout>,
    unit: UnitProgress,
) -> Result<Vec<String>, UnitError> {
    let envelope_id = unit.envelope_id().to_string();
    let documents = source
        .list_documents(&envelope_id)
        .await
        .map_err(UnitError::Source)?;

    unit.start(documents.len()).await;

    let dir = layout.download_dir(&envelope_id);
    tokio::fs::create_dir_all(&dir).await?;

    let mut files = Vec::with_capacity(documents.len());
    for doc in &documents {
        let expected = doc.file_name();
        let label = if tokio::fs::try_exists(dir.join(&expected)).await? {
            tracing::debug!(
                target: "docflow.pipeline",
                envelope_id = %envelope_id,
                file = %expected,
                "document already on disk; fetch skipped"
            );
            expected
        } else {
            let FetchedDocument {
                temp_path,
                content_type,
                filename,
            } = source
                .fetch_document(&envelope_id, &doc.document_id)
                .await
                .map_err(UnitError::Source)?;

            let filename = local_name(&filename);
            let dest = dir.join(&filename);
            if tokio::fs::try_exists(&dest).await? {
                tracing::debug!(
                    target: "docflow.pipeline",
                    envelope_id = %envelope_id,
                    file = %filename,
                    "destination exists; scratch file discarded"
                );
                drop(temp_path);
            } else {
                persist_scratch(temp_path, &dest).await?;
                tracing::debug!(
                    target: "docflow.pipeline",
                    envelope_id = %envelope_id,
                    file = %filename,
                    content_type = %content_type,
                    "document stored"
                );
            }
            filename
        };

        unit.advance(&label).await;
        files.push(label);
    }

    Ok(files)
}
