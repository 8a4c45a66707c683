pub mod docusign;

pub use docusign::DocuSignSource;
