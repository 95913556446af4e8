//! Session Tracking Tests
//!
//! Exercises the session service over the in-memory store: active
//! session listing, per-user statistics, best-effort activity touches,
//! and the retention purge.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use identity_sync::application::services::{SessionService, SessionServiceImpl};
use identity_sync::domain::UserSession;

use crate::common::*;

const RETENTION_DAYS: i64 = 30;

fn session_service(store: &Arc<MemoryStore>) -> SessionServiceImpl<MemoryStore> {
    SessionServiceImpl::new(store.clone(), RETENTION_DAYS)
}

fn session_aged(user_id: Uuid, external_id: &str, age_days: i64, ended: bool) -> UserSession {
    let mut session = UserSession::new(external_id.to_string(), user_id);
    session.created_at = Utc::now() - Duration::days(age_days);
    if ended {
        session.ended_at = Some(session.created_at + Duration::hours(1));
    }
    session
}

// ============================================================
// Active Session Queries
// ============================================================

/// Test only active sessions are listed, newest created first
#[tokio::test]
async fn test_active_sessions_newest_first() {
    // Arrange
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store.seed_session(session_aged(user_id, "sess_old", 5, false));
    store.seed_session(session_aged(user_id, "sess_new", 1, false));
    store.seed_session(session_aged(user_id, "sess_done", 2, true));
    store.seed_session(session_aged(Uuid::new_v4(), "sess_other", 1, false));

    // Act
    let active = session_service(&store)
        .active_sessions(user_id)
        .await
        .unwrap();

    // Assert
    let ids: Vec<&str> = active
        .iter()
        .map(|s| s.external_session_id.as_str())
        .collect();
    assert_eq!(ids, vec!["sess_new", "sess_old"]);
}

/// Test lookup by the provider session id
#[tokio::test]
async fn test_find_by_external_id() {
    // Arrange
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store.seed_session(session_aged(user_id, "sess_1", 1, false));

    let service = session_service(&store);

    // Act & Assert
    let found = service.find_by_external_id("sess_1").await.unwrap();
    assert_eq!(found.unwrap().user_id, user_id);

    let missing = service.find_by_external_id("sess_ghost").await.unwrap();
    assert!(missing.is_none());
}

// ============================================================
// Statistics
// ============================================================

/// Test stats count every session but average only the active ones
#[tokio::test]
async fn test_stats_average_ranges_over_active_sessions() {
    // Arrange - two active sessions (about 2h and 4h old) and one
    // ended session whose 1h duration must not enter the average
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();

    let mut active_short = session_aged(user_id, "sess_a", 0, false);
    active_short.created_at = Utc::now() - Duration::hours(2);
    store.seed_session(active_short);

    let mut active_long = session_aged(user_id, "sess_b", 0, false);
    active_long.created_at = Utc::now() - Duration::hours(4);
    store.seed_session(active_long);

    store.seed_session(session_aged(user_id, "sess_done", 10, true));

    // Act
    let stats = session_service(&store).stats_for_user(user_id).await.unwrap();

    // Assert
    assert_eq!(stats.total_sessions, 3);
    assert_eq!(stats.active_sessions, 2);
    let average = stats.average_session_duration_secs.unwrap();
    let expected = (3 * 3600) as f64;
    assert!(
        (average - expected).abs() < 5.0,
        "expected about {expected}, got {average}"
    );
}

/// Test the average is absent when the user has no active session
#[tokio::test]
async fn test_stats_without_active_sessions() {
    // Arrange
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store.seed_session(session_aged(user_id, "sess_done", 10, true));

    // Act
    let stats = session_service(&store).stats_for_user(user_id).await.unwrap();

    // Assert
    assert_eq!(stats.total_sessions, 1);
    assert_eq!(stats.active_sessions, 0);
    assert!(stats.average_session_duration_secs.is_none());
}

/// Test stats for a user with no sessions at all
#[tokio::test]
async fn test_stats_for_untracked_user() {
    let store = MemoryStore::new();

    let stats = session_service(&store)
        .stats_for_user(Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(stats.total_sessions, 0);
    assert_eq!(stats.active_sessions, 0);
    assert!(stats.average_session_duration_secs.is_none());
}

// ============================================================
// Activity Touch
// ============================================================

/// Test a touch advances last_activity on the matching session
#[tokio::test]
async fn test_touch_advances_last_activity() {
    // Arrange
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    let mut session = session_aged(user_id, "sess_1", 1, false);
    session.last_activity = Utc::now() - Duration::hours(6);
    store.seed_session(session);

    // Act
    session_service(&store).touch_activity("sess_1").await;

    // Assert
    let state = store.snapshot();
    let touched = &state.sessions[0];
    assert!(Utc::now() - touched.last_activity < Duration::seconds(5));
}

/// Test touching an untracked session is silently absorbed
#[tokio::test]
async fn test_touch_unknown_session_is_best_effort() {
    let store = MemoryStore::new();

    // Does not return a Result; nothing to unwrap, nothing panics
    session_service(&store).touch_activity("sess_ghost").await;

    assert!(store.snapshot().sessions.is_empty());
}

// ============================================================
// Retention Purge
// ============================================================

/// Test the purge removes old sessions regardless of state
#[tokio::test]
async fn test_purge_removes_only_sessions_past_retention() {
    // Arrange - one ended session past the window, one active within it
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    store.seed_session(session_aged(user_id, "sess_old", 40, true));
    store.seed_session(session_aged(user_id, "sess_recent", 5, false));

    // Act
    let removed = session_service(&store).purge_expired().await.unwrap();

    // Assert
    assert_eq!(removed, 1);
    let state = store.snapshot();
    assert_eq!(state.sessions.len(), 1);
    assert_eq!(state.sessions[0].external_session_id, "sess_recent");
}

/// Test an ACTIVE session past the window is purged too
#[tokio::test]
async fn test_purge_does_not_spare_active_sessions() {
    // Arrange
    let store = MemoryStore::new();
    store.seed_session(session_aged(Uuid::new_v4(), "sess_stale", 45, false));

    // Act
    let removed = session_service(&store).purge_expired().await.unwrap();

    // Assert
    assert_eq!(removed, 1);
    assert!(store.snapshot().sessions.is_empty());
}

/// Test the purge reports zero when nothing qualifies
#[tokio::test]
async fn test_purge_with_nothing_to_remove() {
    let store = MemoryStore::new();
    store.seed_session(session_aged(Uuid::new_v4(), "sess_1", 1, false));

    let removed = session_service(&store).purge_expired().await.unwrap();

    assert_eq!(removed, 0);
    assert_eq!(store.snapshot().sessions.len(), 1);
}
