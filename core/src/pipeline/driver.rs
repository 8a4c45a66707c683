use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::convert::ConverterPlugin;
use crate::error::PipelineError;
use crate::graph::GraphStorePlugin;
use crate::notify::Notifier;
use crate::progress::{Phase, ProgressMessage};
use crate::source::DocumentSourcePlugin;

use super::convert::convert_envelope;
use super::download::download_envelope;
use super::index::index_envelope;
use super::layout::DataLayout;
use super::report::{BatchReport, PhaseReport};
use super::scheduler::{run_phase, FanOutOptions};

/// Runs Download, Convert and Index in order, each phase fully drained before
/// the next starts, and closes the run with exactly one `Terminate`.
pub struct PhaseDriver {
    source: Arc<dyn DocumentSourcePlugin>,
    converter: Arc<dyn ConverterPlugin>,
    store: Arc<dyn GraphStorePlugin>,
    notifier: Notifier,
    layout: Arc<DataLayout>,
    options: FanOutOptions,
}

#[derive(Default)]
pub struct PhaseDriverBuilder {
    source: Option<Arc<dyn DocumentSourcePlugin>>,
    converter: Option<Arc<dyn ConverterPlugin>>,
    store: Option<Arc<dyn GraphStorePlugin>>,
    notifier: Notifier,
    data_dir: Option<std::path::PathBuf>,
    options: FanOutOptions,
}

impl PhaseDriver {
    pub fn builder() -> PhaseDriverBuilder {
        PhaseDriverBuilder::default()
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Execute one batch run.
    ///
    /// `Terminate` is emitted once the run has started, whatever the outcome;
    /// a listing failure is returned only after it has been sent.
    #[tracing::instrument(name = "batch_run", skip_all, fields(run_id = tracing::field::Empty))]
    pub async fn run(&self) -> Result<BatchReport, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());
        tracing::info!(
            target: "docflow.pipeline",
            run_id = %run_id,
            sinks = ?self.notifier.sink_names(),
            "batch run started"
        );

        let mut report = BatchReport::new(run_id);
        let result = self.run_phases(&mut report).await;

        self.notifier.emit(&ProgressMessage::Terminate).await;

        match result {
            Ok(()) => {
                tracing::info!(
                    target: "docflow.pipeline",
                    envelopes = report.envelopes_discovered,
                    failed = report.failed_envelopes(),
                    "batch run finished"
                );
                Ok(report)
            }
            Err(err) => {
                tracing::error!(target: "docflow.pipeline", error = %err, "batch run aborted");
                Err(err)
            }
        }
    }

    async fn run_phases(&self, report: &mut BatchReport) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(self.layout.root()).await?;

        let envelopes = self
            .source
            .list_completed_envelopes()
            .await
            .map_err(PipelineError::Listing)?;

        let mut seen = HashSet::new();
        let envelope_ids: Vec<String> = envelopes
            .into_iter()
            .map(|e| e.envelope_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        report.envelopes_discovered = envelope_ids.len();

        let source = self.source.clone();
        let layout = self.layout.clone();
        let download = run_phase(
            Phase::Download,
            envelope_ids,
            &self.notifier,
            &self.options,
            move |unit| download_envelope(source.clone(), layout.clone(), unit),
        )
        .await;
        let to_convert = download.completed_ids();
        report.phases.push(download);

        if report.envelopes_discovered == 0 {
            tracing::info!(
                target: "docflow.pipeline",
                "no envelopes found; convert and index skipped"
            );
            report.phases.push(PhaseReport::skipped(Phase::Convert));
            report.phases.push(PhaseReport::skipped(Phase::Index));
            return Ok(());
        }

        let converter = self.converter.clone();
        let layout = self.layout.clone();
        let convert = run_phase(
            Phase::Convert,
            to_convert,
            &self.notifier,
            &self.options,
            move |unit| convert_envelope(converter.clone(), layout.clone(), unit),
        )
        .await;
        let to_index = convert.completed_ids();
        report.phases.push(convert);

        let store = self.store.clone();
        let layout = self.layout.clone();
        let index = run_phase(
            Phase::Index,
            to_index,
            &self.notifier,
            &self.options,
            move |unit| index_envelope(store.clone(), layout.clone(), unit),
        )
        .await;
        let indexed_any = !index.completed_ids().is_empty();
        report.phases.push(index);

        if indexed_any {
            self.finalize_graph(report).await;
        } else {
            tracing::info!(
                target: "docflow.pipeline",
                "nothing indexed; index build and embeddings skipped"
            );
        }
        Ok(())
    }

    async fn finalize_graph(&self, report: &mut BatchReport) {
        if let Err(e) = self.store.build_indices().await {
            tracing::error!(target: "docflow.pipeline", error = %e, "index build failed");
            report.post_index_errors.push(format!("build_indices: {e:#}"));
        }
        if let Err(e) = self.store.compute_embeddings().await {
            tracing::error!(target: "docflow.pipeline", error = %e, "embedding computation failed");
            report
                .post_index_errors
                .push(format!("compute_embeddings: {e:#}"));
        }
    }
}

impl PhaseDriverBuilder {
    pub fn source(mut self, source: Arc<dyn DocumentSourcePlugin>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn ConverterPlugin>) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn store(mut self, store: Arc<dyn GraphStorePlugin>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn options(mut self, options: FanOutOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<PhaseDriver, PipelineError> {
        let missing = |what: &str| PipelineError::Config(format!("{what} not configured"));
        let source = self.source.ok_or_else(|| missing("document source"))?;
        let converter = self.converter.ok_or_else(|| missing("converter"))?;
        let store = self.store.ok_or_else(|| missing("graph store"))?;
        let data_dir = self.data_dir.ok_or_else(|| missing("data directory"))?;
        let layout = Arc::new(DataLayout::new(data_dir, source.account_id()));

        Ok(PhaseDriver {
            source,
            converter,
            store,
            notifier: self.notifier,
            layout,
            options: self.options,
        })
    }
}
