use async_trait::async_trait;

#[async_trait]
pub trait GraphStorePlugin: Send + Sync {
    fn name(&self) -> &str;
    async fn store(&self, record: &serde_json::Value) -> anyhow::Result<()>;
    /// Create search/vector indices once all records are loaded.
    async fn build_indices(&self) -> anyhow::Result<()>;
    async fn compute_embeddings(&self) -> anyhow::Result<()>;
}
