use async_trait::async_trait;

/// Turns raw document bytes into one structured record.
#[async_trait]
pub trait ConverterPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` means the engine answered but produced nothing usable.
    async fn convert(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> anyhow::Result<Option<serde_json::Value>>;
}
