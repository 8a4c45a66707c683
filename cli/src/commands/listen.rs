use docflow_core::api::{AppConfig, CliError};
use uuid::Uuid;

use crate::commands::cli::ListenArgs;
use crate::http::{start_server, AppState, ServerConfig};

/// Flags win over the `[listen]` section.
pub fn server_config(args: &ListenArgs, cfg: &AppConfig) -> ServerConfig {
    ServerConfig {
        host: args
            .host
            .clone()
            .unwrap_or_else(|| cfg.listen.host.clone()),
        port: args.port.unwrap_or(cfg.listen.port),
    }
}

pub async fn handle_listen(args: ListenArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let config = server_config(&args, &cfg);
    let session_id = Uuid::new_v4().to_string();
    tracing::info!(
        target: "docflow.listen",
        host = %config.host,
        port = config.port,
        session_id = %session_id,
        "starting progress receiver"
    );
    start_server(config, AppState::new(session_id)).await?;
    Ok(0)
}
