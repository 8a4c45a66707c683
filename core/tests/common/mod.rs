#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use docflow_core::api::{
    ConverterPlugin, DocumentRef, DocumentSourcePlugin, EnvelopeRef, FanOutOptions,
    FetchedDocument, GraphStorePlugin, MemorySink, Notifier, PhaseDriver, Phase, ProgressMessage,
};
use serde_json::{json, Value};

pub const ACCOUNT: &str = "acct-1";

/// In-memory document source.
#[derive(Default)]
pub struct FakeSource {
    pub envelopes: BTreeMap<String, Vec<DocumentRef>>,
    pub fail_listing: bool,
    pub failing_envelopes: HashSet<String>,
    pub slow_envelopes: HashSet<String>,
    pub fetches: AtomicUsize,
    pub fetched: Mutex<Vec<(String, String)>>,
}

impl FakeSource {
    pub fn with_envelopes(entries: &[(&str, &[&str])]) -> Self {
        let envelopes = entries
            .iter()
            .map(|(id, docs)| {
                let docs = docs
                    .iter()
                    .enumerate()
                    .map(|(i, name)| DocumentRef::new((i + 1).to_string(), *name, "content"))
                    .collect();
                (id.to_string(), docs)
            })
            .collect();
        Self {
            envelopes,
            ..Self::default()
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSourcePlugin for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn account_id(&self) -> &str {
        ACCOUNT
    }

    async fn list_completed_envelopes(&self) -> anyhow::Result<Vec<EnvelopeRef>> {
        if self.fail_listing {
            anyhow::bail!("listing unavailable");
        }
        Ok(self.envelopes.keys().map(EnvelopeRef::new).collect())
    }

    async fn list_documents(&self, envelope_id: &str) -> anyhow::Result<Vec<DocumentRef>> {
        if self.failing_envelopes.contains(envelope_id) {
            anyhow::bail!("envelope {envelope_id} is unreadable");
        }
        if self.slow_envelopes.contains(envelope_id) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.envelopes
            .get(envelope_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown envelope {envelope_id}"))
    }

    async fn fetch_document(
        &self,
        envelope_id: &str,
        document_id: &str,
    ) -> anyhow::Result<FetchedDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched
            .lock()
            .unwrap()
            .push((envelope_id.to_string(), document_id.to_string()));

        let doc = self
            .envelopes
            .get(envelope_id)
            .and_then(|docs| docs.iter().find(|d| d.document_id == document_id))
            .ok_or_else(|| anyhow::anyhow!("unknown document {document_id}"))?;

        let mut scratch = tempfile::NamedTempFile::new()?;
        write!(scratch, "%PDF-1.4 {envelope_id}/{document_id}")?;
        Ok(FetchedDocument {
            temp_path: scratch.into_temp_path(),
            content_type: doc.content_type().to_string(),
            filename: doc.file_name(),
        })
    }
}

/// Converter producing a small agreement record per file.
#[derive(Default)]
pub struct FakeConverter {
    pub failing_files: HashSet<String>,
    pub empty_files: HashSet<String>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ConverterPlugin for FakeConverter {
    fn name(&self) -> &str {
        "fake"
    }

    async fn convert(&self, bytes: Vec<u8>, filename: &str) -> anyhow::Result<Option<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_files.contains(filename) {
            anyhow::bail!("engine rejected {filename}");
        }
        if self.empty_files.contains(filename) {
            return Ok(None);
        }
        Ok(Some(json!({
            "agreement": {
                "agreement_name": filename,
                "size": bytes.len(),
            }
        })))
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub stored: Mutex<Vec<Value>>,
    pub calls: Mutex<Vec<&'static str>>,
    pub fail_indices: bool,
}

impl FakeStore {
    pub fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphStorePlugin for FakeStore {
    fn name(&self) -> &str {
        "fake"
    }

    async fn store(&self, record: &Value) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("store");
        self.stored.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn build_indices(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("build_indices");
        if self.fail_indices {
            anyhow::bail!("index creation refused");
        }
        Ok(())
    }

    async fn compute_embeddings(&self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push("compute_embeddings");
        Ok(())
    }
}

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub converter: Arc<FakeConverter>,
    pub store: Arc<FakeStore>,
    pub sink: Arc<MemorySink>,
    pub driver: PhaseDriver,
}

pub fn harness(
    data_dir: &Path,
    source: FakeSource,
    converter: FakeConverter,
    store: FakeStore,
    options: FanOutOptions,
) -> Harness {
    // RUST_LOG=docflow=debug shows pipeline logs in test output.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let source = Arc::new(source);
    let converter = Arc::new(converter);
    let store = Arc::new(store);
    let sink = Arc::new(MemorySink::new());

    let driver = PhaseDriver::builder()
        .source(source.clone())
        .converter(converter.clone())
        .store(store.clone())
        .notifier(Notifier::new().with_sink(sink.clone()))
        .data_dir(data_dir)
        .options(options)
        .build()
        .expect("driver should build");

    Harness {
        source,
        converter,
        store,
        sink,
        driver,
    }
}

/// Messages of one envelope in one phase, in emission order.
pub fn envelope_messages(
    messages: &[ProgressMessage],
    envelope_id: &str,
    phase: Phase,
) -> Vec<ProgressMessage> {
    messages
        .iter()
        .filter(|m| m.envelope_id() == Some(envelope_id) && m.phase() == Some(phase))
        .cloned()
        .collect()
}

pub fn count_status(messages: &[ProgressMessage], status: &str, phase: Option<Phase>) -> usize {
    messages
        .iter()
        .filter(|m| m.status() == status && (phase.is_none() || m.phase() == phase))
        .count()
}
