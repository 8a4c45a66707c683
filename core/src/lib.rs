//! docflow core: envelope pipeline orchestration.
//!
//! Module map:
//! - [`progress`]: per-envelope tracker, batch aggregator, message model, terminal monitor
//! - [`notify`]: sink trait and fan-out notifier
//! - [`pipeline`]: fan-out executor, phase units, phase driver, reports
//! - [`source`], [`convert`], [`graph`]: collaborator plugin traits
//! - [`config`], [`error`], [`events_out`]: ambient plumbing

pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod events_out;
pub mod graph;
pub mod notify;
pub mod pipeline;
pub mod progress;
pub mod source;
