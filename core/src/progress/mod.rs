//! Two-level progress tracking.
//!
//! [`EnvelopeTracker`] follows each envelope through one phase; [`BatchAggregator`]
//! keeps the phase-wide totals and owns the completion barrier. Both emit
//! [`ProgressMessage`]s through a [`Notifier`](crate::notify::Notifier).
//! [`ProgressMonitor`] renders the same message stream on the terminal.

pub mod batch;
pub mod message;
pub mod monitor;
pub mod tracker;

pub use batch::{BatchAggregator, BatchState};
pub use message::{
    percentage, CurrentEnvelope, EnvelopeStatus, EnvelopeStatusInfo, ItemProgress,
    OverallProgress, Phase, ProgressMessage,
};
pub use monitor::ProgressMonitor;
pub use tracker::EnvelopeTracker;
