//! Graceful shutdown coordination
//!
//! On SIGINT or SIGTERM the coordinator cancels its token (the HTTP server
//! stops accepting connections), waits for pending mutations to reach the
//! data service, then logs the final cache statistics. The whole sequence is
//! bounded by the configured timeout.

use crate::state::AppState;
use anyhow::Result;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Upper bound for the whole sequence before it is forced
    pub total_timeout: Duration,
    pub drain_poll_interval: Duration,
    pub force_shutdown_on_timeout: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            total_timeout: Duration::from_secs(30),
            drain_poll_interval: Duration::from_millis(100),
            force_shutdown_on_timeout: true,
        }
    }
}

impl ShutdownConfig {
    pub fn with_total_timeout(mut self, total_timeout: Duration) -> Self {
        self.total_timeout = total_timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    /// Waiting for pending mutations
    Draining,
    Flushing,
    Complete,
    /// Timed out before draining finished
    Forced,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownPhase::Running => write!(f, "running"),
            ShutdownPhase::Draining => write!(f, "draining"),
            ShutdownPhase::Flushing => write!(f, "flushing"),
            ShutdownPhase::Complete => write!(f, "complete"),
            ShutdownPhase::Forced => write!(f, "forced"),
        }
    }
}

pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    state: Arc<AppState>,
    phase: RwLock<ShutdownPhase>,
    shutdown_token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig, state: Arc<AppState>) -> Self {
        Self {
            config,
            state,
            phase: RwLock::new(ShutdownPhase::Running),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelled once shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase.read()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Resolves on SIGINT (Ctrl+C) or SIGTERM.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => {
                    error!(error = %err, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                info!("received SIGTERM, initiating graceful shutdown");
            },
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("starting graceful shutdown sequence");
        self.shutdown_token.cancel();

        match timeout(self.config.total_timeout, self.run_phases()).await {
            Ok(()) => {
                *self.phase.write() = ShutdownPhase::Complete;
                info!("graceful shutdown completed successfully");
                Ok(())
            }
            Err(_) if self.config.force_shutdown_on_timeout => {
                warn!(
                    timeout_secs = self.config.total_timeout.as_secs(),
                    pending_mutations = self.state.query().pending_mutations(),
                    "graceful shutdown exceeded total timeout, forcing"
                );
                *self.phase.write() = ShutdownPhase::Forced;
                Ok(())
            }
            Err(_) => {
                error!("graceful shutdown exceeded total timeout");
                Err(anyhow::anyhow!("shutdown timeout exceeded"))
            }
        }
    }

    async fn run_phases(&self) {
        *self.phase.write() = ShutdownPhase::Draining;
        loop {
            let pending = self.state.query().pending_mutations();
            if pending == 0 {
                break;
            }
            debug!(pending_mutations = pending, "waiting for mutations to finish");
            sleep(self.config.drain_poll_interval).await;
        }

        *self.phase.write() = ShutdownPhase::Flushing;
        let stats = self.state.query().stats();
        info!(
            cache_size = stats.size,
            cache_capacity = stats.capacity,
            cache_hit_rate = format!("{:.2}%", stats.hit_rate() * 100.0),
            service_fetches = stats.fetches,
            "cache statistics at shutdown"
        );
    }
}
