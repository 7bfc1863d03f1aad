/// Prometheus metrics for the dashboard server
///
/// Counters for the query cache, service fetches, mutations and page renders,
/// exposed in text format at `/metrics`.
use crate::model::ResourceKind;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Instant;

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PageLabels {
    /// Route path, e.g. "/projects"
    pub route: String,
    /// HTTP status class ("ok", "client_error", "server_error")
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RouteLabels {
    pub route: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ResourceLabels {
    /// "users", "projects" or "dashboard-stats"
    pub resource: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MutationLabels {
    pub operation: String,
    /// "success" or "error"
    pub outcome: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,

    pub page_renders: Family<PageLabels, Counter>,
    pub page_render_duration_seconds: Family<RouteLabels, Histogram>,

    pub cache_hits: Counter,
    pub cache_misses: Counter,
    pub cache_entries: Gauge,

    /// Service reads started by the query cache
    pub service_fetches: Family<ResourceLabels, Counter>,
    pub mutations: Family<MutationLabels, Counter>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let page_renders = Family::<PageLabels, Counter>::default();
        registry.register(
            "dashboard_page_renders",
            "Pages rendered by route and status",
            page_renders.clone(),
        );

        let page_render_duration_seconds =
            Family::<RouteLabels, Histogram>::new_with_constructor(|| {
                // 10ms .. ~38s; renders wait on simulated service latency
                Histogram::new(exponential_buckets(0.01, 2.5, 10))
            });
        registry.register(
            "dashboard_page_render_duration_seconds",
            "Page render latency in seconds",
            page_render_duration_seconds.clone(),
        );

        let cache_hits = Counter::default();
        registry.register(
            "dashboard_cache_hits",
            "Query cache reads served from a fresh entry",
            cache_hits.clone(),
        );

        let cache_misses = Counter::default();
        registry.register(
            "dashboard_cache_misses",
            "Query cache reads that started a fetch",
            cache_misses.clone(),
        );

        let cache_entries = Gauge::default();
        registry.register(
            "dashboard_cache_entries",
            "Entries currently held by the query cache",
            cache_entries.clone(),
        );

        let service_fetches = Family::<ResourceLabels, Counter>::default();
        registry.register(
            "dashboard_service_fetches",
            "Data service reads by resource",
            service_fetches.clone(),
        );

        let mutations = Family::<MutationLabels, Counter>::default();
        registry.register(
            "dashboard_mutations",
            "Data service writes by operation and outcome",
            mutations.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            page_renders,
            page_render_duration_seconds,
            cache_hits,
            cache_misses,
            cache_entries,
            service_fetches,
            mutations,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        encode(&mut buffer, &registry).expect("encoding metrics should succeed");
        buffer
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    pub fn update_cache_entries(&self, size: usize) {
        self.cache_entries.set(size as i64);
    }

    pub fn record_fetch(&self, kind: ResourceKind) {
        self.service_fetches
            .get_or_create(&ResourceLabels {
                resource: kind.to_string(),
            })
            .inc();
    }

    pub fn record_mutation(&self, operation: &str, success: bool) {
        self.mutations
            .get_or_create(&MutationLabels {
                operation: operation.to_string(),
                outcome: if success { "success" } else { "error" }.to_string(),
            })
            .inc();
    }

    pub fn record_page(&self, route: &str, status: &str, duration: std::time::Duration) {
        self.page_renders
            .get_or_create(&PageLabels {
                route: route.to_string(),
                status: status.to_string(),
            })
            .inc();
        self.page_render_duration_seconds
            .get_or_create(&RouteLabels {
                route: route.to_string(),
            })
            .observe(duration.as_secs_f64());
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Times one page render and records it when finished or dropped.
///
/// A guard dropped without [`finish`](PageMetrics::finish) counts as a server error.
pub struct PageMetrics {
    route: String,
    start: Instant,
    completed: bool,
}

impl PageMetrics {
    pub fn new(route: &str) -> Self {
        Self {
            route: route.to_string(),
            start: Instant::now(),
            completed: false,
        }
    }

    pub fn finish(mut self, status: axum::http::StatusCode) {
        let class = if status.is_server_error() {
            "server_error"
        } else if status.is_client_error() {
            "client_error"
        } else {
            "ok"
        };
        METRICS.record_page(&self.route, class, self.start.elapsed());
        self.completed = true;
    }
}

impl Drop for PageMetrics {
    fn drop(&mut self) {
        if !self.completed {
            METRICS.record_page(&self.route, "server_error", self.start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        let output = collector.encode();

        assert!(output.contains("dashboard_page_renders"));
        assert!(output.contains("dashboard_cache_hits"));
        assert!(output.contains("dashboard_cache_misses"));
        assert!(output.contains("dashboard_cache_entries"));
    }

    #[test]
    fn test_cache_metrics() {
        let collector = MetricsCollector::new();

        collector.record_cache_hit();
        collector.record_cache_hit();
        collector.record_cache_miss();
        collector.update_cache_entries(5);

        let output = collector.encode();
        assert!(output.contains("dashboard_cache_hits_total 2"));
        assert!(output.contains("dashboard_cache_misses_total 1"));
        assert!(output.contains("dashboard_cache_entries 5"));
    }

    #[test]
    fn test_fetch_and_mutation_labels() {
        let collector = MetricsCollector::new();

        collector.record_fetch(ResourceKind::DashboardStats);
        collector.record_mutation("update_project", false);

        let output = collector.encode();
        assert!(output.contains("resource=\"dashboard-stats\""));
        assert!(output.contains("operation=\"update_project\""));
        assert!(output.contains("outcome=\"error\""));
    }

    #[test]
    fn test_record_page() {
        let collector = MetricsCollector::new();
        collector.record_page("/users", "ok", std::time::Duration::from_millis(20));

        let output = collector.encode();
        assert!(output.contains("route=\"/users\""));
        assert!(output.contains("dashboard_page_render_duration_seconds"));
    }
}
