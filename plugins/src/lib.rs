//! Concrete adapters behind the docflow-core plugin traits.
//!
//! - [`source`]: eSignature REST document source
//! - [`convert`]: HTTP extraction engine
//! - [`graph`]: Neo4j graph store
//! - [`notify`]: webhook progress sink
//! - [`factory`]: builds the adapters from [`docflow_core::api::AppConfig`]

pub mod convert;
pub mod factory;
pub mod graph;
pub mod http;
pub mod notify;
pub mod source;
