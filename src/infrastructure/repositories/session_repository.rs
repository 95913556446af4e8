//! Session Repository Implementation
//!
//! PostgreSQL implementation of the UserSessionRepository trait.
//! Tracks session lifecycle rows mirrored from upstream session events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{UserSession, UserSessionRepository};
use crate::shared::error::AppError;

/// Database row representation matching the user_sessions table schema.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    external_session_id: String,
    user_id: Uuid,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    last_activity: DateTime<Utc>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    session_metadata: Option<serde_json::Value>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    /// Convert database row to domain UserSession entity.
    fn into_session(self) -> UserSession {
        UserSession {
            id: self.id,
            external_session_id: self.external_session_id,
            user_id: self.user_id,
            created_at: self.created_at,
            ended_at: self.ended_at,
            last_activity: self.last_activity,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            session_metadata: self.session_metadata,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL session repository implementation.
#[derive(Clone)]
pub struct PgUserSessionRepository {
    pool: PgPool,
}

impl PgUserSessionRepository {
    /// Create a new PgUserSessionRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserSessionRepository for PgUserSessionRepository {
    /// Find a session by the identifier assigned upstream.
    async fn find_by_external_id(
        &self,
        external_session_id: &str,
    ) -> Result<Option<UserSession>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, external_session_id, user_id, created_at, ended_at, last_activity,
                   ip_address, user_agent, session_metadata, updated_at
            FROM user_sessions
            WHERE external_session_id = $1
            "#,
        )
        .bind(external_session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_session()))
    }

    /// Active sessions for a user, newest first.
    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Vec<UserSession>, AppError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, external_session_id, user_id, created_at, ended_at, last_activity,
                   ip_address, user_agent, session_metadata, updated_at
            FROM user_sessions
            WHERE user_id = $1 AND ended_at IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_session()).collect())
    }

    /// Bump the activity timestamp. Returns false when the session is unknown.
    async fn touch_activity(&self, external_session_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET last_activity = NOW(), updated_at = NOW()
            WHERE external_session_id = $1
            "#,
        )
        .bind(external_session_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete sessions started before the cutoff, regardless of state.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Total number of sessions recorded for a user.
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_sessions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
