//! Session Tracking Service
//!
//! Query and maintenance surface over the tracked sessions: listing a
//! user's active sessions, best-effort activity touches, retention
//! purging, and per-user statistics.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::{SessionStats, UserSession, UserSessionRepository};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Session service trait for dependency injection
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Active sessions for a user, most recently created first.
    async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<UserSession>, AppError>;

    /// Look up a session by the provider session id.
    async fn find_by_external_id(
        &self,
        external_session_id: &str,
    ) -> Result<Option<UserSession>, AppError>;

    /// Record activity on a session. Best-effort: failures and unknown
    /// sessions are logged and swallowed so callers never fail on it.
    async fn touch_activity(&self, external_session_id: &str);

    /// Delete sessions older than the retention window, active or not.
    /// Returns the number of sessions removed.
    async fn purge_expired(&self) -> Result<u64, AppError>;

    /// Aggregate session figures for one user.
    async fn stats_for_user(&self, user_id: Uuid) -> Result<SessionStats, AppError>;
}

/// SessionService implementation
pub struct SessionServiceImpl<S>
where
    S: UserSessionRepository,
{
    sessions: Arc<S>,
    retention_days: i64,
}

impl<S> SessionServiceImpl<S>
where
    S: UserSessionRepository,
{
    /// Create a new SessionServiceImpl
    pub fn new(sessions: Arc<S>, retention_days: i64) -> Self {
        Self {
            sessions,
            retention_days,
        }
    }
}

#[async_trait]
impl<S> SessionService for SessionServiceImpl<S>
where
    S: UserSessionRepository + 'static,
{
    async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<UserSession>, AppError> {
        self.sessions.find_active_for_user(user_id).await
    }

    async fn find_by_external_id(
        &self,
        external_session_id: &str,
    ) -> Result<Option<UserSession>, AppError> {
        self.sessions.find_by_external_id(external_session_id).await
    }

    async fn touch_activity(&self, external_session_id: &str) {
        match self.sessions.touch_activity(external_session_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    external_session_id = %external_session_id,
                    "activity touch for untracked session"
                );
            }
            Err(e) => {
                tracing::warn!(
                    external_session_id = %external_session_id,
                    error = %e,
                    "activity touch failed"
                );
            }
        }
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let removed = self.sessions.delete_created_before(cutoff).await?;

        if removed > 0 {
            metrics::record_sessions_purged(removed);
            tracing::info!(
                removed = removed,
                retention_days = self.retention_days,
                "purged expired sessions"
            );
        }

        Ok(removed)
    }

    async fn stats_for_user(&self, user_id: Uuid) -> Result<SessionStats, AppError> {
        let total_sessions = self.sessions.count_for_user(user_id).await?;
        let active = self.sessions.find_active_for_user(user_id).await?;

        // The average ranges over the active sessions, measured up to
        // now since they have no end timestamp yet.
        let average_session_duration_secs = if active.is_empty() {
            None
        } else {
            let total: f64 = active.iter().map(|s| s.duration_secs() as f64).sum();
            Some(total / active.len() as f64)
        };

        Ok(SessionStats {
            total_sessions,
            active_sessions: active.len() as i64,
            average_session_duration_secs,
        })
    }
}
