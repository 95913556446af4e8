//! Retry Flow Tests
//!
//! Exercises the retry service over the in-memory store: eligibility
//! checks, the attempt counter, and reprocessing of stored payloads.

use std::sync::Arc;

use identity_sync::application::services::{
    EventProcessorImpl, RetryError, RetryService, RetryServiceImpl,
};
use identity_sync::domain::WebhookEventStatus;
use uuid::Uuid;

use crate::common::*;

const MAX_RETRIES: i32 = 3;

fn retry_service(
    store: &Arc<MemoryStore>,
) -> RetryServiceImpl<MemoryStore, EventProcessorImpl<MemoryStore, MemoryUnitOfWork>> {
    let uow = Arc::new(MemoryUnitOfWork::new(store.clone()));
    let processor = Arc::new(EventProcessorImpl::new(store.clone(), uow));
    RetryServiceImpl::new(store.clone(), processor, MAX_RETRIES)
}

fn session_created_payload(session_id: &str, user_external_id: &str) -> serde_json::Value {
    serde_json::json!({
        "id": session_id,
        "user_id": user_external_id,
        "status": "active",
        "created_at": 1_700_000_000_000_i64,
        "last_active_at": 1_700_000_000_000_i64
    })
}

/// Test a failed event succeeds on retry once its precondition holds
#[tokio::test]
async fn test_retry_succeeds_once_user_exists() {
    // Arrange - a session.created that failed because the user was unknown
    let store = MemoryStore::new();
    let event = failed_event(
        "session.created",
        Some("sess_1"),
        session_created_payload("sess_1", "user_29w8"),
        0,
    );
    let event_id = event.id;
    store.seed_event(event);
    // The user.created delivery has arrived in the meantime
    store.seed_user(test_user("user_29w8"));

    // Act
    let processed = retry_service(&store).retry_event(event_id).await.unwrap();

    // Assert
    assert_eq!(processed.event_id, event_id);
    let state = store.snapshot();
    assert_eq!(state.sessions.len(), 1);
    let stored = state.events.iter().find(|e| e.id == event_id).unwrap();
    assert_eq!(stored.status, WebhookEventStatus::Success);
    assert_eq!(stored.retry_count, 1);
    assert!(stored.error_message.is_none());
}

/// Test retrying an unknown event id reports not found
#[tokio::test]
async fn test_retry_unknown_event_is_not_found() {
    // Arrange
    let store = MemoryStore::new();

    // Act
    let err = retry_service(&store)
        .retry_event(Uuid::new_v4())
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(err, RetryError::NotFound(_)));
}

/// Test a successful event cannot be retried
#[tokio::test]
async fn test_retry_rejected_for_successful_event() {
    // Arrange
    let store = MemoryStore::new();
    let mut event = failed_event("user.deleted", Some("user_1"), serde_json::json!({}), 0);
    event.status = WebhookEventStatus::Success;
    let event_id = event.id;
    store.seed_event(event);

    // Act
    let err = retry_service(&store).retry_event(event_id).await.unwrap_err();

    // Assert
    match err {
        RetryError::NotRetryable { reason, .. } => {
            assert!(reason.contains("status"), "got: {}", reason)
        }
        other => panic!("expected NotRetryable, got {:?}", other),
    }
}

/// Test the retry ceiling is enforced
#[tokio::test]
async fn test_retry_rejected_at_ceiling() {
    // Arrange - already at the limit
    let store = MemoryStore::new();
    let event = failed_event(
        "session.created",
        Some("sess_1"),
        session_created_payload("sess_1", "user_29w8"),
        MAX_RETRIES,
    );
    let event_id = event.id;
    store.seed_event(event);

    // Act
    let err = retry_service(&store).retry_event(event_id).await.unwrap_err();

    // Assert
    match err {
        RetryError::NotRetryable { reason, .. } => {
            assert!(reason.contains("limit"), "got: {}", reason)
        }
        other => panic!("expected NotRetryable, got {:?}", other),
    }
}

/// Test a retry that fails again moves the row back to failed
#[tokio::test]
async fn test_failed_retry_marks_failed_again() {
    // Arrange - the referenced user still does not exist
    let store = MemoryStore::new();
    let event = failed_event(
        "session.created",
        Some("sess_1"),
        session_created_payload("sess_1", "user_ghost"),
        0,
    );
    let event_id = event.id;
    store.seed_event(event);

    // Act
    let err = retry_service(&store).retry_event(event_id).await.unwrap_err();

    // Assert - attempt counted, failure recorded, still retryable next time
    assert!(matches!(err, RetryError::Processing(_)));
    let state = store.snapshot();
    assert!(state.sessions.is_empty());
    let stored = state.events.iter().find(|e| e.id == event_id).unwrap();
    assert_eq!(stored.status, WebhookEventStatus::Failed);
    assert_eq!(stored.retry_count, 1);
    assert!(stored
        .error_message
        .as_deref()
        .unwrap()
        .contains("unknown user"));
}

/// Test a stored payload that no longer validates fails the retry
#[tokio::test]
async fn test_retry_with_invalid_stored_payload_fails() {
    // Arrange - user.created row whose payload lacks email addresses
    let store = MemoryStore::new();
    let event = failed_event(
        "user.created",
        Some("user_29w8"),
        serde_json::json!({
            "id": "user_29w8",
            "email_addresses": [],
            "created_at": 1_700_000_000_000_i64,
            "updated_at": 1_700_000_001_000_i64
        }),
        0,
    );
    let event_id = event.id;
    store.seed_event(event);

    // Act
    let err = retry_service(&store).retry_event(event_id).await.unwrap_err();

    // Assert
    assert!(matches!(err, RetryError::Processing(_)));
    let stored = store
        .snapshot()
        .events
        .iter()
        .find(|e| e.id == event_id)
        .cloned()
        .unwrap();
    assert_eq!(stored.status, WebhookEventStatus::Failed);
    assert!(stored
        .error_message
        .as_deref()
        .unwrap()
        .contains("email_addresses"));
}
