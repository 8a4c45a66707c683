pub mod models;
pub mod r#trait;

pub use models::{DocumentRef, EnvelopeRef, FetchedDocument};
pub use r#trait::DocumentSourcePlugin;
