//! Progress receiver: accepts webhook progress messages and serves the latest
//! payload per envelope.

pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use models::*;
pub use server::*;
pub use state::*;
