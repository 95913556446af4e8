//! Webhook Ingestion API Tests
//!
//! Full-stack tests over the real router: signature verification,
//! validation, the event ledger, and user/session synchronization.

use axum::http::StatusCode;
use chrono::Utc;

use identity_sync::domain::WebhookEventStatus;

use crate::common::*;

// ============================================================
// User Event Tests
// ============================================================

/// Test a signed user.created delivery synchronizes the user
#[tokio::test]
async fn test_user_created_synchronizes_user() {
    // Arrange
    let app = TestApp::new().await;
    let body = user_event_body("user.created", "user_29w8", "ada@example.com");

    // Act
    let response = app.deliver("msg_1", &body).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["eventType"], "user.created");

    let state = app.store.snapshot();
    assert_eq!(state.users.len(), 1);
    let user = &state.users[0];
    assert_eq!(user.external_id, "user_29w8");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.first_name.as_deref(), Some("Ada"));
    assert_eq!(user.created_at.timestamp_millis(), 1_700_000_000_000);
}

/// Test the delivery lands in the ledger with audit fields
#[tokio::test]
async fn test_delivery_is_recorded_in_ledger() {
    // Arrange
    let app = TestApp::new().await;
    let body = user_event_body("user.created", "user_29w8", "ada@example.com");

    // Act
    let response = app.deliver("msg_audit", &body).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.events.len(), 1);
    let event = &state.events[0];
    assert_eq!(event.event_type, "user.created");
    assert_eq!(event.status, WebhookEventStatus::Success);
    assert_eq!(event.subject_id.as_deref(), Some("user_29w8"));
    assert_eq!(event.webhook_id.as_deref(), Some("msg_audit"));
    assert!(event.processed_at.is_some());
    assert!(event.processing_duration_ms.is_some());
    assert!(event.error_message.is_none());
}

/// Test user.updated refreshes an existing profile in place
#[tokio::test]
async fn test_user_updated_refreshes_profile() {
    // Arrange
    let app = TestApp::new().await;
    app.deliver(
        "msg_1",
        &user_event_body("user.created", "user_29w8", "ada@example.com"),
    )
    .await;

    // Act
    let response = app
        .deliver(
            "msg_2",
            &user_event_body("user.updated", "user_29w8", "countess@example.com"),
        )
        .await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.users.len(), 1);
    assert_eq!(state.users[0].email, "countess@example.com");
    assert_eq!(state.events.len(), 2);
    assert!(state
        .events
        .iter()
        .all(|e| e.status == WebhookEventStatus::Success));
}

/// Test a redelivered user.created converges instead of duplicating
#[tokio::test]
async fn test_replayed_delivery_converges() {
    // Arrange
    let app = TestApp::new().await;
    let body = user_event_body("user.created", "user_29w8", "ada@example.com");

    // Act
    app.deliver("msg_1", &body).await;
    let response = app.deliver("msg_1", &body).await;

    // Assert - one user, but both deliveries on record
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.users.len(), 1);
    assert_eq!(state.events.len(), 2);
}

/// Test user.deleted removes the user and cascades to sessions
#[tokio::test]
async fn test_user_deleted_removes_user_and_sessions() {
    // Arrange
    let app = TestApp::new().await;
    app.deliver(
        "msg_1",
        &user_event_body("user.created", "user_29w8", "ada@example.com"),
    )
    .await;
    app.deliver("msg_2", &session_created_body("sess_1", "user_29w8"))
        .await;

    // Act
    let response = app.deliver("msg_3", &user_deleted_body("user_29w8")).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert!(state.users.is_empty());
    assert!(state.sessions.is_empty());
    assert_eq!(state.events.len(), 3);
    assert!(state
        .events
        .iter()
        .all(|e| e.status == WebhookEventStatus::Success));
}

/// Test user.deleted for a user that was never tracked still succeeds
#[tokio::test]
async fn test_user_deleted_for_unknown_user_succeeds() {
    // Arrange
    let app = TestApp::new().await;

    // Act
    let response = app.deliver("msg_1", &user_deleted_body("user_gone")).await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.events.len(), 1);
    assert_eq!(state.events[0].status, WebhookEventStatus::Success);
}

// ============================================================
// Rejection Tests
// ============================================================

/// Test an unsigned delivery is rejected before anything is stored
#[tokio::test]
async fn test_unsigned_delivery_rejected() {
    // Arrange
    let app = TestApp::new().await;
    let body = user_event_body("user.created", "user_29w8", "ada@example.com");

    // Act
    let response = app.deliver_unsigned(&body).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("missing"));

    let state = app.store.snapshot();
    assert!(state.events.is_empty());
    assert!(state.users.is_empty());
}

/// Test a tampered signature is rejected
#[tokio::test]
async fn test_tampered_signature_rejected() {
    // Arrange
    let app = TestApp::new().await;
    let body = user_event_body("user.created", "user_29w8", "ada@example.com");
    let timestamp = Utc::now().timestamp().to_string();
    let signature = sign("msg_other", &timestamp, &body);

    // Act - signature was computed for a different message id
    let response = app.deliver_raw("msg_1", &timestamp, &signature, &body).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.store.snapshot().events.is_empty());
}

/// Test a stale timestamp outside the tolerance window is rejected
#[tokio::test]
async fn test_stale_timestamp_rejected() {
    // Arrange
    let app = TestApp::new().await;
    let body = user_event_body("user.created", "user_29w8", "ada@example.com");
    let stale = (Utc::now().timestamp() - 400).to_string();
    let signature = sign("msg_1", &stale, &body);

    // Act
    let response = app.deliver_raw("msg_1", &stale, &signature, &body).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("tolerance"));
    assert!(app.store.snapshot().events.is_empty());
}

/// Test a signed but malformed body is rejected with no ledger row
#[tokio::test]
async fn test_malformed_json_rejected() {
    // Arrange
    let app = TestApp::new().await;

    // Act
    let response = app.deliver("msg_1", "this is not json").await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("JSON"));
    assert!(app.store.snapshot().events.is_empty());
}

/// Test a valid envelope with an invalid payload is rejected
#[tokio::test]
async fn test_invalid_payload_rejected_before_storage() {
    // Arrange - user.created without any email addresses
    let app = TestApp::new().await;
    let body = serde_json::json!({
        "type": "user.created",
        "object": "event",
        "data": {
            "id": "user_29w8",
            "email_addresses": [],
            "created_at": 1_700_000_000_000_i64,
            "updated_at": 1_700_000_001_000_i64
        }
    })
    .to_string();

    // Act
    let response = app.deliver("msg_1", &body).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("email_addresses"));

    let state = app.store.snapshot();
    assert!(state.events.is_empty());
    assert!(state.users.is_empty());
}

/// Test an unrecognized event type is acknowledged and recorded
#[tokio::test]
async fn test_unknown_event_type_acknowledged() {
    // Arrange
    let app = TestApp::new().await;
    let body = serde_json::json!({
        "type": "organization.logo_updated",
        "object": "event",
        "data": {"id": "org_1"}
    })
    .to_string();

    // Act
    let response = app.deliver("msg_1", &body).await;

    // Assert - acknowledged, on record, no local effect
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["eventType"], "organization.logo_updated");

    let state = app.store.snapshot();
    assert_eq!(state.events.len(), 1);
    assert_eq!(state.events[0].status, WebhookEventStatus::Success);
    assert!(state.users.is_empty());
    assert!(state.sessions.is_empty());
}

// ============================================================
// Session Event Tests
// ============================================================

/// Test session.created opens a tracked session for a known user
#[tokio::test]
async fn test_session_created_tracks_session() {
    // Arrange
    let app = TestApp::new().await;
    app.deliver(
        "msg_1",
        &user_event_body("user.created", "user_29w8", "ada@example.com"),
    )
    .await;

    // Act
    let response = app
        .deliver("msg_2", &session_created_body("sess_1", "user_29w8"))
        .await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.sessions.len(), 1);
    let session = &state.sessions[0];
    assert_eq!(session.external_session_id, "sess_1");
    assert_eq!(session.user_id, state.users[0].id);
    assert!(session.ended_at.is_none());
    assert_eq!(session.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(session.user_agent.as_deref(), Some("Firefox 128.0"));
}

/// Test session.created for an unknown user fails and is marked failed
#[tokio::test]
async fn test_session_created_unknown_user_fails() {
    // Arrange
    let app = TestApp::new().await;

    // Act
    let response = app
        .deliver("msg_1", &session_created_body("sess_1", "user_ghost"))
        .await;

    // Assert - 500, ledger row failed, no session row
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);

    let state = app.store.snapshot();
    assert!(state.sessions.is_empty());
    assert_eq!(state.events.len(), 1);
    let event = &state.events[0];
    assert_eq!(event.status, WebhookEventStatus::Failed);
    assert!(event
        .error_message
        .as_deref()
        .unwrap()
        .contains("unknown user"));
}

/// Test session.ended closes the tracked session
#[tokio::test]
async fn test_session_ended_closes_session() {
    // Arrange
    let app = TestApp::new().await;
    app.deliver(
        "msg_1",
        &user_event_body("user.created", "user_29w8", "ada@example.com"),
    )
    .await;
    app.deliver("msg_2", &session_created_body("sess_1", "user_29w8"))
        .await;

    // Act
    let response = app
        .deliver(
            "msg_3",
            &session_lifecycle_body("session.ended", "sess_1", "user_29w8"),
        )
        .await;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.sessions.len(), 1);
    assert!(state.sessions[0].ended_at.is_some());
}

/// Test session.removed and session.revoked close sessions like ended
#[tokio::test]
async fn test_session_removed_and_revoked_close_sessions() {
    for event_type in ["session.removed", "session.revoked"] {
        // Arrange
        let app = TestApp::new().await;
        app.deliver(
            "msg_1",
            &user_event_body("user.created", "user_29w8", "ada@example.com"),
        )
        .await;
        app.deliver("msg_2", &session_created_body("sess_1", "user_29w8"))
            .await;

        // Act
        let response = app
            .deliver(
                "msg_3",
                &session_lifecycle_body(event_type, "sess_1", "user_29w8"),
            )
            .await;

        // Assert
        assert_eq!(response.status(), StatusCode::OK, "{}", event_type);
        let state = app.store.snapshot();
        assert!(state.sessions[0].ended_at.is_some(), "{}", event_type);
    }
}

/// Test ending a session that was never tracked still acknowledges
#[tokio::test]
async fn test_session_ended_for_unknown_session_succeeds() {
    // Arrange
    let app = TestApp::new().await;

    // Act
    let response = app
        .deliver(
            "msg_1",
            &session_lifecycle_body("session.ended", "sess_ghost", "user_29w8"),
        )
        .await;

    // Assert - best effort: acknowledged and recorded as success
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.events.len(), 1);
    assert_eq!(state.events[0].status, WebhookEventStatus::Success);
}

/// Test a replayed session.created does not reopen an ended session
#[tokio::test]
async fn test_replayed_session_created_does_not_reopen() {
    // Arrange
    let app = TestApp::new().await;
    app.deliver(
        "msg_1",
        &user_event_body("user.created", "user_29w8", "ada@example.com"),
    )
    .await;
    let created = session_created_body("sess_1", "user_29w8");
    app.deliver("msg_2", &created).await;
    app.deliver(
        "msg_3",
        &session_lifecycle_body("session.ended", "sess_1", "user_29w8"),
    )
    .await;

    // Act - the provider redelivers the original session.created
    let response = app.deliver("msg_2", &created).await;

    // Assert - the session stays closed
    assert_eq!(response.status(), StatusCode::OK);
    let state = app.store.snapshot();
    assert_eq!(state.sessions.len(), 1);
    assert!(state.sessions[0].ended_at.is_some());
}
