pub mod actions;
pub mod config;
pub mod error;
pub mod forms;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod query;
pub mod router;
pub mod server;
pub mod service;
pub mod shutdown;
pub mod state;
pub mod stores;
pub mod validation;
pub mod views;

pub use actions::{ActionRequest, ActionResponse, UiAction, dispatch};
pub use config::{CliArgs, ServerConfig};
pub use error::{DashboardError, DashboardResult, ERROR_METRICS, ErrorCode};
pub use logging::{LoggingConfig, init_logging};
pub use query::{QueryClient, QueryKey, QueryStatus};
pub use server::build_router;
pub use shutdown::{ShutdownConfig, ShutdownCoordinator};
pub use state::AppState;

use anyhow::{Context, Result};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::new(config.clone()));

    tracing::info!(
        bind = %config.http_bind_address,
        stats_mode = %config.stats_mode,
        latency_scale = config.latency_scale,
        cache_capacity = config.cache_capacity,
        "starting admin dashboard",
    );

    let shutdown_config = ShutdownConfig::default().with_total_timeout(config.shutdown_timeout);
    let coordinator = Arc::new(ShutdownCoordinator::new(shutdown_config, state.clone()));

    let router = build_router(state);
    let listener = TcpListener::bind(config.http_bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind_address))?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(bind = %actual_addr, "listening");

    let signal_coordinator = coordinator.clone();
    let token = coordinator.token();
    let server_future = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = signal_coordinator.wait_for_signal() => {}
                _ = token.cancelled() => {}
            }
        })
        .into_future();

    let server_result = server_future.await;

    tracing::info!("server stopped, draining");
    if let Err(e) = coordinator.shutdown().await {
        tracing::error!("error during shutdown: {}", e);
    }

    server_result.map_err(anyhow::Error::from)
}
