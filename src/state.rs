use crate::config::ServerConfig;
use crate::query::QueryClient;
use crate::service::{DataService, MockDataService};
use crate::stores::UiContext;
use std::sync::Arc;
use tracing::debug;

/// Everything one dashboard instance shares between requests.
pub struct AppState {
    config: Arc<ServerConfig>,
    query: QueryClient,
    /// Created once at application root and handed to every view
    ui: UiContext,
}

impl AppState {
    /// Builds the state around a seeded [`MockDataService`].
    pub fn new(config: Arc<ServerConfig>) -> Self {
        let service = MockDataService::new(config.latency_profile(), config.stats_mode);
        debug!(
            users = service.user_count(),
            projects = service.project_count(),
            stats_mode = %config.stats_mode,
            "seeded mock data service"
        );
        Self::with_service(config, Arc::new(service))
    }

    pub fn with_service(config: Arc<ServerConfig>, service: Arc<dyn DataService>) -> Self {
        let query = QueryClient::new(service, config.query_options());
        Self {
            config,
            query,
            ui: UiContext::new(),
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn query(&self) -> &QueryClient {
        &self.query
    }

    pub fn ui(&self) -> &UiContext {
        &self.ui
    }
}
