//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `docflow_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, AppConfig, ConverterConfig, EventsOutConfig, GraphConfig, ListenConfig,
    LoggingConfig, NotifyConfig, PipelineConfig, SourceConfig,
};
pub use crate::convert::ConverterPlugin;
pub use crate::error::{CliError, PipelineError, UnitError};
pub use crate::events_out::{start_events_out, EventsOutTx};
pub use crate::graph::GraphStorePlugin;
pub use crate::notify::{EventsOutSink, MemorySink, NotificationSink, Notifier};
pub use crate::pipeline::{
    BatchReport, DataLayout, FanOutOptions, PhaseDriver, PhaseDriverBuilder, PhaseReport,
    UnitOutcome,
};
pub use crate::progress::{
    BatchAggregator, BatchState, EnvelopeStatus, EnvelopeStatusInfo, EnvelopeTracker, Phase,
    ProgressMessage, ProgressMonitor,
};
pub use crate::source::{DocumentRef, DocumentSourcePlugin, EnvelopeRef, FetchedDocument};
