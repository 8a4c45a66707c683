use async_trait::async_trait;

use super::models::{DocumentRef, EnvelopeRef, FetchedDocument};

#[async_trait]
pub trait DocumentSourcePlugin: Send + Sync {
    fn name(&self) -> &str;
    /// Account the envelopes belong to; used to lay out local files.
    fn account_id(&self) -> &str;
    async fn list_completed_envelopes(&self) -> anyhow::Result<Vec<EnvelopeRef>>;
    async fn list_documents(&self, envelope_id: &str) -> anyhow::Result<Vec<DocumentRef>>;
    async fn fetch_document(
        &self,
        envelope_id: &str,
        document_id: &str,
    ) -> anyhow::Result<FetchedDocument>;
}
