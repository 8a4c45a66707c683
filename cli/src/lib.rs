//! docflow CLI library: command handlers and the progress receiver, exposed for tests.

pub mod app;
pub mod commands;
pub mod http;
