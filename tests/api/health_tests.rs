//! Health Check API Tests
//!
//! Drives the health and metrics endpoints through the real router.
//! The readiness probe needs PostgreSQL, so only its failure path is
//! covered here: the test pool points at nothing and never connects.

use axum::http::StatusCode;

use crate::common::*;

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
}

/// Test health check returns JSON with status and version fields
#[tokio::test]
async fn test_health_check_returns_json() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;
    let json = body_json(response).await;

    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}

/// Test liveness probe endpoint
#[tokio::test]
async fn test_liveness_returns_alive() {
    let app = TestApp::new().await;

    let response = app.get("/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "alive");
}

/// Test readiness reports 503 when the database is unreachable
#[tokio::test]
async fn test_readiness_unhealthy_without_database() {
    let app = TestApp::new().await;

    let response = app.get("/health/ready").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["checks"]["database"]["status"], "unhealthy");
    // The ledger snapshot is skipped when the database is down
    assert!(json.get("sync").is_none());
}

/// Test the metrics endpoint serves the Prometheus text format
#[tokio::test]
async fn test_metrics_endpoint_serves_text_format() {
    let app = TestApp::new().await;
    // Process one delivery so the event counters exist
    app.deliver(
        "msg_1",
        &user_event_body("user.created", "user_29w8", "ada@example.com"),
    )
    .await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("identity_sync_webhook_events_total"));
}

/// Test unknown routes fall through to 404
#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new().await;

    let response = app.get("/does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
