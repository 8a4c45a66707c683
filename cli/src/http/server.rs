//! Progress receiver lifecycle

use super::{
    middleware::{create_middleware_stack, request_logger},
    routes::create_router,
    AppState,
};
use axum::middleware;
use docflow_core::api::CliError;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, CliError> {
        format!("{}:{}", self.host, self.port).parse().map_err(|e| {
            CliError::Config(format!(
                "invalid listen address {}:{}: {e}",
                self.host, self.port
            ))
        })
    }
}

pub fn create_app(state: AppState) -> axum::Router {
    create_router(state)
        .layer(middleware::from_fn(request_logger))
        .layer(create_middleware_stack())
}

/// Binds and serves until Ctrl+C or SIGTERM.
pub async fn start_server(config: ServerConfig, state: AppState) -> Result<(), CliError> {
    let addr = config.addr()?;
    let listener = TcpListener::bind(&addr).await?;
    info!(
        target: "docflow.listen",
        session_id = %state.session_id,
        "progress receiver listening on http://{}",
        listener.local_addr()?
    );

    serve(listener, state, shutdown_signal()).await
}

/// Serves on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), CliError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!(target: "docflow.listen", "progress receiver stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!(target: "docflow.listen", "Received Ctrl+C signal");
        }
        _ = wait_for_sigterm() => {
            info!(target: "docflow.listen", "Received SIGTERM signal");
        }
    }
    info!(target: "docflow.listen", "Starting graceful shutdown...");
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(target: "docflow.listen", error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
