// =============================================================================
// HTTP surface
// =============================================================================
// Pages, actions and the operational endpoints, driven through the router
// with `oneshot` so no socket is bound.

use admin_dashboard::{AppState, ServerConfig, build_router};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    let config = ServerConfig {
        latency_scale: 0.0,
        ..ServerConfig::default()
    };
    build_router(Arc::new(AppState::new(Arc::new(config))))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

async fn post_action(app: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/actions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_str(&body).expect("json body"))
}

// =============================================================================
// Operational endpoints
// =============================================================================

#[tokio::test]
async fn test_liveness_endpoint_returns_healthy() {
    let (status, json) = get(&test_app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_checks_service_and_cache() {
    let (status, json) = get(&test_app(), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["components"]["data_service"]["status"], "healthy");
    assert_eq!(json["components"]["query_cache"]["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_page_counters() {
    let app = test_app();
    get(&app, "/users").await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("dashboard_page_renders"));
    assert!(body.contains("dashboard_service_fetches"));
}

// =============================================================================
// Pages
// =============================================================================

#[tokio::test]
async fn test_every_route_renders_inside_the_shell() {
    let app = test_app();
    for (path, page) in [
        ("/", "home"),
        ("/users", "users"),
        ("/projects", "projects"),
        ("/analytics", "placeholder"),
        ("/settings", "placeholder"),
    ] {
        let (status, json) = get(&app, path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(json["page"]["page"], page, "{path}");
        assert_eq!(json["navigation"].as_array().unwrap().len(), 5);
        assert_eq!(json["sidebarOpen"], false);
    }
}

#[tokio::test]
async fn test_home_page_shows_stats_and_recent_rows() {
    let (_, json) = get(&test_app(), "/").await;
    let home = &json["page"];
    assert_eq!(home["stats"]["state"], "ready");
    assert_eq!(home["stats"]["data"][0]["title"], "Total Users");
    assert_eq!(home["stats"]["data"][3]["title"], "Total Revenue");
    assert!(home["recentUsers"]["data"].as_array().unwrap().len() <= 5);
    assert_eq!(home["recentProjects"]["state"], "ready");
}

#[tokio::test]
async fn test_unknown_path_is_invalid_page() {
    let (status, json) = get(&test_app(), "/reports/2024").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["page"]["title"], "Oops...");
    assert_eq!(json["page"]["message"], "Sorry, invalid page");
    assert!(json["navigation"].as_array().unwrap().iter().all(|item| item["active"] == false));
}

// =============================================================================
// Actions
// =============================================================================

#[tokio::test]
async fn test_search_action_filters_without_refetch() {
    let app = test_app();
    let (_, before) = get(&app, "/users").await;
    let total = before["page"]["listing"]["data"]["users"].as_array().unwrap().len();
    assert!(total > 1);

    let (status, json) = post_action(
        &app,
        json!({"action": {"type": "set-user-search", "query": "ZZZ-nobody"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["result"], "applied");
    let listing = &json["shell"]["page"]["listing"]["data"];
    assert!(listing["users"].as_array().unwrap().is_empty());
    assert_eq!(listing["empty"]["title"], "No users found");
    assert_eq!(listing["summary"]["total"], total);
}

#[tokio::test]
async fn test_edit_project_status_through_actions() {
    let app = test_app();
    let (_, page) = get(&app, "/projects").await;
    let project = page["page"]["listing"]["data"]["projects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|card| &card["project"])
        .find(|project| project["status"] != "on-hold")
        .expect("a project that is not on hold")
        .clone();
    let id = project["id"].as_str().unwrap();

    let (status, _) = post_action(
        &app,
        json!({"action": {"type": "open-edit-project", "id": id}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    post_action(
        &app,
        json!({"action": {"type": "edit-project", "change": {"field": "status", "value": "on-hold"}}}),
    )
    .await;
    let (status, json) = post_action(&app, json!({"action": {"type": "submit-project"}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["result"], "project-submit");
    assert_eq!(json["outcome"]["outcome"], "saved");
    assert_eq!(json["shell"]["page"]["modal"]["isOpen"], false);

    let (_, page) = get(&app, "/projects").await;
    let relisted = page["page"]["listing"]["data"]["projects"]
        .as_array()
        .unwrap()
        .iter()
        .find(|card| card["project"]["id"] == id)
        .unwrap()
        .clone();
    assert_eq!(relisted["project"]["status"], "on-hold");
    assert_eq!(relisted["project"]["progress"], project["progress"]);
}

#[tokio::test]
async fn test_invalid_submit_reports_field_errors() {
    let app = test_app();
    post_action(&app, json!({"action": {"type": "open-create-user"}})).await;
    let (status, json) = post_action(&app, json!({"action": {"type": "submit-user"}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"]["outcome"], "invalid");
    assert_eq!(json["outcome"]["errors"]["name"], "Name is required");
    assert_eq!(json["shell"]["page"]["modal"]["isOpen"], true);
}

#[tokio::test]
async fn test_open_edit_for_unknown_id_is_not_found() {
    let (status, json) = post_action(
        &test_app(),
        json!({"action": {"type": "open-edit-user", "id": "no-such-user"}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_sidebar_toggle_stays_on_current_page() {
    let app = test_app();
    let (_, json) = post_action(
        &app,
        json!({"from": "settings", "action": {"type": "toggle-sidebar"}}),
    )
    .await;
    assert_eq!(json["shell"]["sidebarOpen"], true);
    assert_eq!(json["shell"]["route"], "settings");

    let (_, json) = post_action(&app, json!({"action": {"type": "navigate", "to": "users"}})).await;
    assert_eq!(json["shell"]["sidebarOpen"], false);
    assert_eq!(json["shell"]["page"]["page"], "users");
}

#[tokio::test]
async fn test_malformed_action_is_rejected() {
    let (status, _) = send(
        &test_app(),
        Request::builder()
            .method(Method::POST)
            .uri("/actions")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"action": {"type": "launch-rockets"}}"#))
            .unwrap(),
    )
    .await;
    assert!(status.is_client_error());
}
