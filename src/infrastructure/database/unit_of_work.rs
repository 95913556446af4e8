//! Unit of Work Pattern Implementation
//!
//! Provides transactional boundaries for event processing. Every business
//! mutation of one webhook event and the success mark on its ledger row
//! run in a single PostgreSQL transaction, so they succeed or fail together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{EventTransaction, SessionRecord, UnitOfWork, User, UserProfile, UserSession};
use crate::shared::error::AppError;

/// Database row for users returned from transactional statements.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    username: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            external_id: self.external_id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Database row for sessions returned from transactional statements.
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

/// PostgreSQL transaction implementing the event-processing mutations.
pub struct PgEventTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl EventTransaction for PgEventTransaction {
    /// Look up a synchronized user by provider id.
    async fn find_user_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, external_id, email, first_name, last_name, username, image_url,
                   created_at, updated_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Insert or update the user projection, keyed on external id.
    /// Provider timestamps are taken as-is so redeliveries converge.
    async fn upsert_user(&mut self, profile: &UserProfile) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, external_id, email, first_name, last_name, username,
                               image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (external_id) DO UPDATE
            SET email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                image_url = EXCLUDED.image_url,
                updated_at = EXCLUDED.updated_at
            RETURNING id, external_id, email, first_name, last_name, username, image_url,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&profile.external_id)
        .bind(&profile.email)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.username)
        .bind(&profile.image_url)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into_user())
    }

    /// Delete the user projection. Sessions cascade at the schema level.
    async fn remove_user(&mut self, external_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE external_id = $1")
            .bind(external_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert or refresh a tracked session, keyed on the provider session id.
    /// A redelivered create never reopens a session that has already ended.
    async fn create_session(
        &mut self,
        record: &SessionRecord,
        user_id: Uuid,
    ) -> Result<UserSession, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO user_sessions (id, external_session_id, user_id, ip_address,
                                       user_agent, session_metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_session_id) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                ip_address = EXCLUDED.ip_address,
                user_agent = EXCLUDED.user_agent,
                session_metadata = EXCLUDED.session_metadata,
                last_activity = NOW(),
                updated_at = NOW()
            RETURNING id, external_session_id, user_id, created_at, ended_at, last_activity,
                      ip_address, user_agent, session_metadata, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.external_session_id)
        .bind(user_id)
        .bind(&record.ip_address)
        .bind(&record.user_agent)
        .bind(&record.metadata)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into_session())
    }

    /// Close a session by provider id. COALESCE keeps the original end
    /// timestamp when the session already ended.
    async fn end_session(&mut self, external_session_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET ended_at = COALESCE(ended_at, NOW()), updated_at = NOW()
            WHERE external_session_id = $1
            "#,
        )
        .bind(external_session_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip the event's ledger row to success inside the same transaction
    /// as the business mutation it records.
    async fn mark_event_succeeded(
        &mut self,
        event_id: Uuid,
        duration_ms: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'success', error_message = NULL, processed_at = NOW(),
                processing_duration_ms = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(event_id)
        .bind(duration_ms)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await.map_err(AppError::Database)
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await.map_err(AppError::Database)
    }
}

/// PostgreSQL Unit of Work implementation.
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    /// Create a new Unit of Work instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn EventTransaction>, AppError> {
        let tx = self.pool.begin().await.map_err(AppError::Database)?;
        Ok(Box::new(PgEventTransaction { tx }))
    }
}
