use std::time::Duration;

use thiserror::Error;

/// Failure of a single envelope unit. Always scoped to that envelope: the
/// executor turns it into a `fail()` on both trackers and siblings carry on.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("document source error: {0:#}")]
    Source(anyhow::Error),

    #[error("conversion failed for {file}: {cause:#}")]
    Convert {
        file: String,
        cause: anyhow::Error,
    },

    #[error("graph store rejected {file}: {cause:#}")]
    Store {
        file: String,
        cause: anyhow::Error,
    },

    #[error("no structured record produced for {0}")]
    EmptyRecord(String),

    #[error("invalid record {file}: {message}")]
    InvalidRecord { file: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unit timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("unit panicked: {0}")]
    Panicked(String),
}

impl UnitError {
    /// Short machine-readable label used in logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Source(_) => "source",
            Self::Convert { .. } => "convert",
            Self::Store { .. } => "store",
            Self::EmptyRecord(_) => "empty_record",
            Self::InvalidRecord { .. } => "invalid_record",
            Self::Io(_) => "io",
            Self::Timeout(_) => "timeout",
            Self::Panicked(_) => "panicked",
        }
    }
}

/// Run-level failures. `Config` is raised before any unit launches.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("envelope listing failed: {0:#}")]
    Listing(anyhow::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
