//! HTTP surface of the dashboard.
//!
//! Every page path is served by one handler that resolves the route, loads
//! the page and wraps it in the shell. Unknown paths fall through to the same
//! handler and get the 404 error view.

use crate::actions::{self, ActionRequest, ActionResponse};
use crate::error::DashboardError;
use crate::health::{self, HealthChecker};
use crate::logging::page_span;
use crate::metrics::{METRICS, PageMetrics};
use crate::router::Route;
use crate::state::AppState;
use crate::views::{self, ErrorPage, Page, Shell};
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Instant;
use strum::IntoEnumIterator;
use tracing::Instrument;

const SLOW_PAGE_MS: u64 = 2_000;

/// Label used in metrics for paths that match no route.
const UNMATCHED_ROUTE: &str = "unmatched";

pub fn build_router(state: Arc<AppState>) -> Router {
    let health_checker = Arc::new(HealthChecker::new(state.clone()));

    let mut pages = Router::new();
    for route in Route::iter() {
        pages = pages.route(route.path(), get(page_handler));
    }
    let pages = pages
        .route("/actions", post(action_handler))
        .fallback(page_handler)
        .with_state(state);

    let ops = Router::new()
        .route("/health", get(health::liveness_handler))
        .route("/ready", get(health::readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(health_checker);

    ops.merge(pages)
}

async fn metrics_handler() -> (StatusCode, String) {
    (StatusCode::OK, METRICS.encode())
}

fn shell_response(shell: Shell) -> Response {
    (shell.status(), Json(shell)).into_response()
}

async fn page_handler(State(state): State<Arc<AppState>>, uri: Uri) -> Response {
    let route = Route::resolve(uri.path());
    let label = route.as_ref().map_or(UNMATCHED_ROUTE, |route| route.path());
    let metrics = PageMetrics::new(label);
    let started = Instant::now();

    let shell = async move {
        match route {
            Ok(route) => {
                let page = views::load(route, state.query(), state.ui()).await;
                Shell::new(Some(route), state.ui(), page)
            }
            Err(error) => {
                tracing::debug!(path = uri.path(), error = %error, "no route");
                Shell::new(None, state.ui(), Page::Error(ErrorPage::for_error(&error)))
            }
        }
    }
    .instrument(page_span(label))
    .await;

    crate::log_slow_operation!(
        started.elapsed(),
        SLOW_PAGE_MS,
        route = label,
        "page rendered"
    );
    let status = shell.status();
    metrics.finish(status);
    shell_response(shell)
}

async fn action_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, DashboardError> {
    let route = request.target();
    let metrics = PageMetrics::new(route.path());
    let action = request.action.name();

    let result = actions::dispatch(&state, request)
        .instrument(page_span(route.path()))
        .await;

    match result {
        Ok(response) => {
            metrics.finish(response.shell.status());
            Ok(Json(response))
        }
        Err(error) => {
            error.track(action);
            tracing::warn!(action, error = %error, "action failed");
            metrics.finish(error.code().status_code());
            Err(error)
        }
    }
}
