use std::sync::Arc;

use anyhow::Result;

use docflow_core::api::{
    AppConfig, ConverterPlugin, DocumentSourcePlugin, GraphStorePlugin, NotificationSink,
};

use crate::convert::HttpConverter;
use crate::graph::Neo4jStore;
use crate::notify::WebhookSink;
use crate::source::DocuSignSource;

pub fn build_source(cfg: &AppConfig) -> Result<Arc<dyn DocumentSourcePlugin>> {
    Ok(Arc::new(DocuSignSource::new(&cfg.source)?))
}

pub fn build_converter(cfg: &AppConfig) -> Result<Arc<dyn ConverterPlugin>> {
    Ok(Arc::new(HttpConverter::new(&cfg.converter)?))
}

pub fn build_store(cfg: &AppConfig) -> Result<Arc<dyn GraphStorePlugin>> {
    Ok(Arc::new(Neo4jStore::new(&cfg.graph)?))
}

/// Webhook sink for the configured destination; `None` when no URL is set.
pub fn build_webhook(cfg: &AppConfig) -> Result<Option<Arc<dyn NotificationSink>>> {
    if cfg.notify.url.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(Arc::new(WebhookSink::new(&cfg.notify)?)))
}
