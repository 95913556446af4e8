//! Unit of Work seam for event processing.
//!
//! The processor runs every business mutation of one webhook event
//! inside a single transaction, together with the success mark on the
//! event's ledger row. These traits define that boundary in domain
//! terms so the application layer never sees a concrete database
//! handle; the PostgreSQL implementation lives in the infrastructure
//! layer and test fakes implement the same contract in memory.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{User, UserSession};
use crate::domain::events::{SessionRecord, UserProfile};
use crate::shared::error::AppError;

/// The mutations available inside one event-processing transaction.
///
/// Commit and rollback consume the transaction; dropping it without
/// either discards all work, matching the underlying database behavior.
#[async_trait]
pub trait EventTransaction: Send {
    /// Look up a synchronized user by provider id.
    async fn find_user_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<User>, AppError>;

    /// Insert or update the user projection for a provider profile.
    /// Keyed on external id, so redelivered events converge.
    async fn upsert_user(&mut self, profile: &UserProfile) -> Result<User, AppError>;

    /// Delete the user projection. Returns whether a row existed.
    async fn remove_user(&mut self, external_id: &str) -> Result<bool, AppError>;

    /// Insert or refresh a tracked session for the given local user.
    /// Keyed on the provider session id.
    async fn create_session(
        &mut self,
        record: &SessionRecord,
        user_id: Uuid,
    ) -> Result<UserSession, AppError>;

    /// Close a session by provider id. Returns whether a row matched;
    /// an already-ended session keeps its original end timestamp.
    async fn end_session(&mut self, external_session_id: &str) -> Result<bool, AppError>;

    /// Flip the event's ledger row to success, recording when it
    /// finished and how long processing took.
    async fn mark_event_succeeded(
        &mut self,
        event_id: Uuid,
        duration_ms: i64,
    ) -> Result<(), AppError>;

    /// Commit the transaction.
    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    /// Rollback the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Factory for event-processing transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Begin a new transaction.
    async fn begin(&self) -> Result<Box<dyn EventTransaction>, AppError>;
}
