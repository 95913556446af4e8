//! User session entity and repository trait.
//!
//! Maps to the `user_sessions` table in the database schema. Sessions
//! mirror the identity provider's session lifecycle: a `session.created`
//! event opens a row, any of the end-of-life events closes it by setting
//! `ended_at`. A session with no `ended_at` is active.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Represents one tracked user session.
///
/// Maps to the `user_sessions` table:
/// - id: UUID PRIMARY KEY DEFAULT gen_random_uuid()
/// - external_session_id: VARCHAR(255) NOT NULL UNIQUE (provider session id)
/// - user_id: UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - ended_at: TIMESTAMPTZ NULL (NULL while active)
/// - last_activity: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - ip_address: VARCHAR(45) NULL
/// - user_agent: TEXT NULL
/// - session_metadata: JSONB NULL
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    /// UUID primary key
    pub id: Uuid,

    /// Provider-issued session id (unique)
    pub external_session_id: String,

    /// Owning user (local UUID, not the provider id)
    pub user_id: Uuid,

    /// When the session started
    pub created_at: DateTime<Utc>,

    /// When the session ended (None while active)
    pub ended_at: Option<DateTime<Utc>>,

    /// Most recent activity seen for this session
    pub last_activity: DateTime<Utc>,

    /// Client IP address as reported by the provider
    pub ip_address: Option<String>,

    /// Client user agent / browser description
    pub user_agent: Option<String>,

    /// Additional provider-supplied context (JSON)
    pub session_metadata: Option<serde_json::Value>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl UserSession {
    /// Check if the session is currently active.
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Session duration in seconds.
    ///
    /// Ended sessions measure creation to end; active sessions measure
    /// creation to now, so the value grows on every call.
    pub fn duration_secs(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.created_at).num_seconds()
    }

    /// Create a new active session.
    pub fn new(external_session_id: String, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_session_id,
            user_id,
            created_at: now,
            ended_at: None,
            last_activity: now,
            ip_address: None,
            user_agent: None,
            session_metadata: None,
            updated_at: now,
        }
    }
}

/// Aggregate session figures for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    /// All sessions ever tracked for the user
    pub total_sessions: i64,

    /// Sessions with no end timestamp
    pub active_sessions: i64,

    /// Mean duration across the currently active sessions, in seconds.
    /// None when the user has no active session.
    pub average_session_duration_secs: Option<f64>,
}

/// Repository trait for UserSession data access operations.
#[async_trait]
pub trait UserSessionRepository: Send + Sync {
    /// Find a session by the provider-issued session id.
    async fn find_by_external_id(
        &self,
        external_session_id: &str,
    ) -> Result<Option<UserSession>, AppError>;

    /// All active sessions for a user, most recently created first.
    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Vec<UserSession>, AppError>;

    /// Update `last_activity` to now. Returns whether a row matched.
    async fn touch_activity(&self, external_session_id: &str) -> Result<bool, AppError>;

    /// Delete every session created before the cutoff, active or not.
    /// Returns the number of rows removed.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, AppError>;

    /// Count all sessions for a user, active or ended.
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64, AppError>;
}
