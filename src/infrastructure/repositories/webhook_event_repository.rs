//! Webhook Event Repository Implementation
//!
//! PostgreSQL implementation of the WebhookEventRepository trait.
//! Bookkeeping writes here run on the pool so they commit independently
//! of any business transaction in flight.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{WebhookEvent, WebhookEventRepository, WebhookEventStatus};
use crate::shared::error::AppError;

/// Database row representation matching the webhook_events table schema.
#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    id: Uuid,
    event_type: String,
    subject_id: Option<String>,
    payload: serde_json::Value,
    status: String,
    error_message: Option<String>,
    retry_count: i32,
    processed_at: Option<DateTime<Utc>>,
    webhook_id: Option<String>,
    webhook_timestamp: Option<DateTime<Utc>>,
    processing_duration_ms: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WebhookEventRow {
    /// Convert database row to domain WebhookEvent entity.
    fn into_event(self) -> WebhookEvent {
        WebhookEvent {
            id: self.id,
            event_type: self.event_type,
            subject_id: self.subject_id,
            payload: self.payload,
            status: WebhookEventStatus::from_str(&self.status),
            error_message: self.error_message,
            retry_count: self.retry_count,
            processed_at: self.processed_at,
            webhook_id: self.webhook_id,
            webhook_timestamp: self.webhook_timestamp,
            processing_duration_ms: self.processing_duration_ms,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL webhook event repository implementation.
#[derive(Clone)]
pub struct PgWebhookEventRepository {
    pool: PgPool,
}

impl PgWebhookEventRepository {
    /// Create a new PgWebhookEventRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PgWebhookEventRepository {
    /// Insert a new row in `processing` state.
    async fn create_processing(&self, event: &WebhookEvent) -> Result<WebhookEvent, AppError> {
        let row = sqlx::query_as::<_, WebhookEventRow>(
            r#"
            INSERT INTO webhook_events (
                id, event_type, subject_id, payload, status, retry_count,
                webhook_id, webhook_timestamp, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, event_type, subject_id, payload, status, error_message, retry_count,
                      processed_at, webhook_id, webhook_timestamp, processing_duration_ms,
                      created_at, updated_at
            "#,
        )
        .bind(event.id)
        .bind(&event.event_type)
        .bind(&event.subject_id)
        .bind(&event.payload)
        .bind(event.status.as_str())
        .bind(event.retry_count)
        .bind(&event.webhook_id)
        .bind(event.webhook_timestamp)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_event())
    }

    /// Find an event by its UUID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, AppError> {
        let row = sqlx::query_as::<_, WebhookEventRow>(
            r#"
            SELECT id, event_type, subject_id, payload, status, error_message, retry_count,
                   processed_at, webhook_id, webhook_timestamp, processing_duration_ms,
                   created_at, updated_at
            FROM webhook_events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_event()))
    }

    /// Record a failed attempt.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'failed', error_message = $2, processed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Move a failed event to `retrying` and bump its attempt counter.
    async fn mark_retrying(&self, id: Uuid) -> Result<WebhookEvent, AppError> {
        let row = sqlx::query_as::<_, WebhookEventRow>(
            r#"
            UPDATE webhook_events
            SET status = 'retrying', retry_count = retry_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING id, event_type, subject_id, payload, status, error_message, retry_count,
                      processed_at, webhook_id, webhook_timestamp, processing_duration_ms,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Webhook event {} not found", id)))?;

        Ok(row.into_event())
    }

    /// Total number of events in the ledger.
    async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM webhook_events")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Number of events currently in the given status.
    async fn count_by_status(&self, status: WebhookEventStatus) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM webhook_events WHERE status = $1",
        )
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Failed events, oldest first.
    async fn find_failed(&self, limit: i64) -> Result<Vec<WebhookEvent>, AppError> {
        let rows = sqlx::query_as::<_, WebhookEventRow>(
            r#"
            SELECT id, event_type, subject_id, payload, status, error_message, retry_count,
                   processed_at, webhook_id, webhook_timestamp, processing_duration_ms,
                   created_at, updated_at
            FROM webhook_events
            WHERE status = 'failed'
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_event()).collect())
    }

    /// Mean processing duration across successful events.
    async fn average_processing_duration_ms(&self) -> Result<Option<f64>, AppError> {
        let avg = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(processing_duration_ms)::DOUBLE PRECISION
            FROM webhook_events
            WHERE status = 'success' AND processing_duration_ms IS NOT NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(avg)
    }
}
