//! Concurrent envelope pipeline.
//!
//! # Architecture
//!
//! ```text
//! PhaseDriver::run()
//!   ↓
//! list_completed_envelopes()
//!   ↓
//! run_phase(Download) → one spawned unit per envelope → wait_drained()
//!   ↓ envelopes that completed
//! run_phase(Convert)  → one spawned unit per envelope → wait_drained()
//!   ↓ envelopes that completed
//! run_phase(Index)    → one spawned unit per envelope → wait_drained()
//!   ↓
//! build_indices() → compute_embeddings()
//!   ↓
//! Terminate
//! ```
//!
//! Each phase gets fresh trackers. A unit only sees its [`UnitProgress`]
//! handle; the executor owns the matching [`UnitReporter`] and finishes the
//! envelope from the unit's returned outcome.

mod convert;
mod download;
mod driver;
mod index;
pub mod layout;
pub mod report;
mod scheduler;
mod unit;

pub use convert::convert_envelope;
pub use download::download_envelope;
pub use driver::{PhaseDriver, PhaseDriverBuilder};
pub use index::index_envelope;
pub use layout::DataLayout;
pub use report::{BatchReport, PhaseReport, UnitOutcome};
pub use scheduler::{run_phase, FanOutOptions};
pub use unit::{PhaseProgress, UnitProgress, UnitReporter};
