//! Webhook event entity and repository trait.
//!
//! Maps to the `webhook_events` table in the database schema. Every
//! delivery that passes signature verification and validation gets a
//! row here before any business mutation runs, so the ledger survives
//! rollbacks and records the terminal outcome of each attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Processing status enum matching database VARCHAR constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventStatus {
    #[default]
    Processing,
    Success,
    Failed,
    Retrying,
}

impl WebhookEventStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "retrying" => Self::Retrying,
            _ => Self::Processing,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Retrying => "retrying",
        }
    }

    /// Whether this status allows a transition to `next`.
    ///
    /// Processing and retrying resolve to success or failed; failed may
    /// move back to retrying; success is terminal.
    pub fn can_transition_to(&self, next: WebhookEventStatus) -> bool {
        matches!(
            (self, next),
            (Self::Processing, Self::Success)
                | (Self::Processing, Self::Failed)
                | (Self::Failed, Self::Retrying)
                | (Self::Retrying, Self::Success)
                | (Self::Retrying, Self::Failed)
        )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for WebhookEventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents one received webhook delivery and its processing outcome.
///
/// Maps to the `webhook_events` table:
/// - id: UUID PRIMARY KEY DEFAULT gen_random_uuid()
/// - event_type: VARCHAR(100) NOT NULL (e.g. "user.created")
/// - subject_id: VARCHAR(255) NULL (provider id the event is about)
/// - payload: JSONB NOT NULL (the raw `data` object as delivered)
/// - status: VARCHAR(20) NOT NULL DEFAULT 'processing'
/// - error_message: TEXT NULL
/// - retry_count: INT NOT NULL DEFAULT 0
/// - processed_at: TIMESTAMPTZ NULL
/// - webhook_id: VARCHAR(255) NULL (provider delivery id)
/// - webhook_timestamp: TIMESTAMPTZ NULL (provider-signed timestamp)
/// - processing_duration_ms: BIGINT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// UUID primary key
    pub id: Uuid,

    /// Provider event type tag
    pub event_type: String,

    /// Provider id of the entity the event concerns, when derivable
    pub subject_id: Option<String>,

    /// Raw event data as delivered
    pub payload: serde_json::Value,

    /// Current processing status
    #[serde(default)]
    pub status: WebhookEventStatus,

    /// Failure detail from the most recent attempt
    pub error_message: Option<String>,

    /// Number of retry attempts performed so far
    pub retry_count: i32,

    /// When the most recent attempt reached a terminal outcome
    pub processed_at: Option<DateTime<Utc>>,

    /// Provider-assigned delivery id (from the signed headers)
    pub webhook_id: Option<String>,

    /// Provider-signed delivery timestamp
    pub webhook_timestamp: Option<DateTime<Utc>>,

    /// Wall-clock duration of the successful attempt
    pub processing_duration_ms: Option<i64>,

    /// Row creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl WebhookEvent {
    /// Create a fresh ledger row for an incoming delivery.
    pub fn new_processing(
        event_type: String,
        subject_id: Option<String>,
        payload: serde_json::Value,
        webhook_id: Option<String>,
        webhook_timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_type,
            subject_id,
            payload,
            status: WebhookEventStatus::Processing,
            error_message: None,
            retry_count: 0,
            processed_at: None,
            webhook_id,
            webhook_timestamp,
            processing_duration_ms: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this event may be retried given the configured ceiling.
    ///
    /// Only failed events qualify, and only while the attempt count is
    /// below the ceiling.
    pub fn is_retryable(&self, max_retries: i32) -> bool {
        self.status == WebhookEventStatus::Failed && self.retry_count < max_retries
    }
}

/// Repository trait for the webhook event ledger.
///
/// Covers the bookkeeping writes that must be visible outside the
/// business transaction (row creation, failure marks, retry marks) and
/// the statistics read surface. The success mark is deliberately NOT
/// here: it belongs to the event transaction so a success can only be
/// recorded together with the business mutation it describes.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Insert a new row in `processing` state. Commits independently of
    /// any business transaction.
    async fn create_processing(&self, event: &WebhookEvent) -> Result<WebhookEvent, AppError>;

    /// Find an event by its UUID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<WebhookEvent>, AppError>;

    /// Record a failed attempt: status, error message, processed_at.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError>;

    /// Move a failed event to `retrying` and increment its retry count.
    /// Returns the updated row.
    async fn mark_retrying(&self, id: Uuid) -> Result<WebhookEvent, AppError>;

    /// Total number of events in the ledger.
    async fn count(&self) -> Result<i64, AppError>;

    /// Number of events currently in the given status.
    async fn count_by_status(&self, status: WebhookEventStatus) -> Result<i64, AppError>;

    /// Failed events, oldest first, up to `limit` rows.
    async fn find_failed(&self, limit: i64) -> Result<Vec<WebhookEvent>, AppError>;

    /// Mean processing duration across successful events, if any exist.
    async fn average_processing_duration_ms(&self) -> Result<Option<f64>, AppError>;
}
