use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub graph: GraphConfig,

    #[serde(default)]
    pub notify: NotifyConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub events_out: EventsOutConfig,

    #[serde(default)]
    pub listen: ListenConfig,
}

impl AppConfig {
    /// Check everything a batch run needs before any unit is launched.
    pub fn validate_for_run(&self) -> Result<(), PipelineError> {
        let mut missing = Vec::new();
        if self.source.account_id.trim().is_empty() {
            missing.push("source.account_id");
        }
        if self.source.token.trim().is_empty() {
            missing.push("source.token");
        }
        if self.source.base_uri.trim().is_empty() {
            missing.push("source.base_uri");
        }
        if self.converter.url.trim().is_empty() {
            missing.push("converter.url");
        }
        if self.graph.uri.trim().is_empty() {
            missing.push("graph.uri");
        }
        if !missing.is_empty() {
            return Err(PipelineError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.pipeline.data_dir.trim().is_empty() {
            return Err(PipelineError::Config("pipeline.data_dir is empty".into()));
        }
        for name in self.notify.headers.keys() {
            if name.trim().is_empty() {
                return Err(PipelineError::Config("notify.headers has an empty name".into()));
            }
        }
        Ok(())
    }
}

/// Where `tracing` output goes. Console and file sinks can be combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,

    /// Write to stderr.
    pub console: bool,

    /// Write `docflow.<pid>.log` under `directory`.
    pub file: bool,

    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,

    /// Log directory; blank means `~/.docflow/logs`.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            console: true,
            file: true,
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Remote document source (eSignature REST API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_base_uri")]
    pub base_uri: String,

    #[serde(default)]
    pub account_id: String,

    /// Pre-issued bearer token.
    #[serde(default)]
    pub token: String,

    /// How far back to look for completed envelopes.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_source_base_uri() -> String {
    "https://demo.docusign.net".to_string()
}

fn default_lookback_days() -> i64 {
    1
}

fn default_source_timeout_ms() -> u64 {
    60_000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_uri: default_source_base_uri(),
            account_id: String::new(),
            token: String::new(),
            lookback_days: default_lookback_days(),
            timeout_ms: default_source_timeout_ms(),
        }
    }
}

/// Document-to-record extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_converter_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_converter_timeout_ms() -> u64 {
    300_000
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            timeout_ms: default_converter_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Base URL of the HTTP endpoint, e.g. `http://localhost:7474`.
    #[serde(default = "default_graph_uri")]
    pub uri: String,

    #[serde(default = "default_graph_database")]
    pub database: String,

    #[serde(default = "default_graph_user")]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Token handed to the store's embedding procedure.
    #[serde(default)]
    pub embedding_token: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_graph_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_graph_uri() -> String {
    "http://localhost:7474".to_string()
}

fn default_graph_database() -> String {
    "neo4j".to_string()
}

fn default_graph_user() -> String {
    "neo4j".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_graph_timeout_ms() -> u64 {
    120_000
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_graph_uri(),
            database: default_graph_database(),
            user: default_graph_user(),
            password: String::new(),
            embedding_token: String::new(),
            embedding_model: default_embedding_model(),
            timeout_ms: default_graph_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint; empty disables webhook delivery.
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_notify_timeout_ms")]
    pub timeout_ms: u64,

    /// Draw terminal progress bars.
    #[serde(default)]
    pub progress: bool,
}

fn default_notify_timeout_ms() -> u64 {
    10_000
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            headers: BTreeMap::new(),
            timeout_ms: default_notify_timeout_ms(),
            progress: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root for downloads and converted records; `~` is expanded.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Cap on concurrently running units; 0 means unbounded.
    #[serde(default)]
    pub max_parallel: usize,

    /// Per-unit deadline; 0 disables it.
    #[serde(default = "default_unit_timeout_ms")]
    pub unit_timeout_ms: u64,
}

fn default_data_dir() -> String {
    "~/.docflow/data".to_string()
}

fn default_unit_timeout_ms() -> u64 {
    600_000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_parallel: 0,
            unit_timeout_ms: default_unit_timeout_ms(),
        }
    }
}

impl PipelineConfig {
    pub fn data_dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(self.data_dir.trim()).into_owned())
    }

    pub fn unit_timeout(&self) -> Option<Duration> {
        (self.unit_timeout_ms > 0).then(|| Duration::from_millis(self.unit_timeout_ms))
    }

    pub fn max_parallel(&self) -> Option<usize> {
        (self.max_parallel > 0).then_some(self.max_parallel)
    }
}

/// JSONL mirror of the progress stream. `stdout:` writes to standard output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsOutConfig {
    pub enabled: bool,
    pub path: String,
    pub channel_capacity: usize,
    pub drop_when_full: bool,
}

impl Default for EventsOutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "./progress.events.jsonl".to_string(),
            channel_capacity: 2048,
            drop_when_full: true,
        }
    }
}

/// Progress receiver (`docflow listen`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen_host")]
    pub host: String,

    #[serde(default = "default_listen_port")]
    pub port: u16,
}

fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    8787
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
        }
    }
}
