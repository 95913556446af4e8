//! Transactional Webhook Event Processing
//!
//! Drives one event through the bookkeeping protocol:
//!
//! 1. A ledger row is written through the pool, committing on its own,
//!    so the delivery is on record no matter what happens next.
//! 2. The business mutation and the success mark run inside a single
//!    transaction; they land together or not at all.
//! 3. On failure the transaction rolls back and the failure mark is
//!    written through the pool again, outside the dead transaction.
//!
//! The same attempt logic serves fresh deliveries (`ingest`) and
//! replays of stored rows (`reprocess`).

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::{WebhookEvent, WebhookEventRepository};
use crate::domain::events::{KnownEvent, WebhookEnvelope};
use crate::domain::unit_of_work::{EventTransaction, UnitOfWork};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Provider correlation details captured from the signed headers.
#[derive(Debug, Clone, Default)]
pub struct DeliveryMetadata {
    /// Provider delivery id
    pub webhook_id: Option<String>,

    /// Provider-signed delivery timestamp
    pub webhook_timestamp: Option<DateTime<Utc>>,
}

/// What a successfully processed event did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    /// User projection inserted or refreshed
    UserUpserted,

    /// User projection deleted (or was already absent)
    UserRemoved,

    /// Session row opened or refreshed
    SessionStarted,

    /// Session row closed
    SessionEnded,

    /// End-of-life event for a session that was never tracked
    SessionMissing,

    /// Validated but deliberately without local effect
    Ignored,
}

/// Receipt for a processed event.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    /// Ledger row id
    pub event_id: Uuid,

    /// Provider event type tag
    pub event_type: String,

    /// What the event did
    pub effect: EventEffect,
}

/// Event processing errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The ledger row could not be written; nothing was processed.
    #[error("event bookkeeping failed: {0}")]
    Bookkeeping(AppError),

    /// The business mutation failed after the ledger row was written.
    /// The row records the failure detail.
    #[error("event {event_id} processing failed: {message}")]
    Processing { event_id: Uuid, message: String },
}

/// Event processor trait for dependency injection
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Record a fresh delivery in the ledger and process it.
    async fn ingest(
        &self,
        envelope: &WebhookEnvelope,
        event: &KnownEvent,
        delivery: &DeliveryMetadata,
    ) -> Result<ProcessedEvent, ProcessorError>;

    /// Re-run processing for an existing ledger row. No new row is
    /// created; the stored row's status moves with the attempt.
    async fn reprocess(
        &self,
        stored: &WebhookEvent,
        event: &KnownEvent,
    ) -> Result<ProcessedEvent, ProcessorError>;
}

/// EventProcessor implementation
pub struct EventProcessorImpl<R, U>
where
    R: WebhookEventRepository,
    U: UnitOfWork,
{
    events: Arc<R>,
    uow: Arc<U>,
}

impl<R, U> EventProcessorImpl<R, U>
where
    R: WebhookEventRepository,
    U: UnitOfWork,
{
    /// Create a new EventProcessorImpl
    pub fn new(events: Arc<R>, uow: Arc<U>) -> Self {
        Self { events, uow }
    }

    /// One processing attempt against an already-recorded ledger row.
    async fn attempt(
        &self,
        row: &WebhookEvent,
        event: &KnownEvent,
    ) -> Result<ProcessedEvent, ProcessorError> {
        let started = Instant::now();

        match self.run_in_transaction(row, event, started).await {
            Ok(effect) => {
                metrics::record_webhook_event(&row.event_type, "success", started.elapsed());
                tracing::info!(
                    event_id = %row.id,
                    event_type = %row.event_type,
                    effect = ?effect,
                    "webhook event processed"
                );
                Ok(ProcessedEvent {
                    event_id: row.id,
                    event_type: row.event_type.clone(),
                    effect,
                })
            }
            Err(err) => {
                let message = err.to_string();
                // The failure mark goes through the pool so it survives
                // the rolled-back transaction.
                if let Err(mark_err) = self.events.mark_failed(row.id, &message).await {
                    tracing::error!(
                        event_id = %row.id,
                        error = %mark_err,
                        "could not record event failure"
                    );
                }
                metrics::record_webhook_event(&row.event_type, "failed", started.elapsed());
                tracing::warn!(
                    event_id = %row.id,
                    event_type = %row.event_type,
                    error = %message,
                    "webhook event failed"
                );
                Err(ProcessorError::Processing {
                    event_id: row.id,
                    message,
                })
            }
        }
    }

    /// Business mutation plus success mark, atomically.
    async fn run_in_transaction(
        &self,
        row: &WebhookEvent,
        event: &KnownEvent,
        started: Instant,
    ) -> Result<EventEffect, AppError> {
        let mut tx = self.uow.begin().await?;

        let effect = match dispatch(tx.as_mut(), event).await {
            Ok(effect) => effect,
            Err(e) => {
                rollback_quietly(tx, row.id).await;
                return Err(e);
            }
        };

        let duration_ms = started.elapsed().as_millis() as i64;
        if let Err(e) = tx.mark_event_succeeded(row.id, duration_ms).await {
            rollback_quietly(tx, row.id).await;
            return Err(e);
        }

        tx.commit().await?;
        Ok(effect)
    }
}

#[async_trait]
impl<R, U> EventProcessor for EventProcessorImpl<R, U>
where
    R: WebhookEventRepository + 'static,
    U: UnitOfWork + 'static,
{
    async fn ingest(
        &self,
        envelope: &WebhookEnvelope,
        event: &KnownEvent,
        delivery: &DeliveryMetadata,
    ) -> Result<ProcessedEvent, ProcessorError> {
        let row = WebhookEvent::new_processing(
            envelope.event_type.clone(),
            event.subject_id().map(str::to_string),
            envelope.data.clone(),
            delivery.webhook_id.clone(),
            delivery.webhook_timestamp,
        );

        let stored = self
            .events
            .create_processing(&row)
            .await
            .map_err(ProcessorError::Bookkeeping)?;

        tracing::debug!(
            event_id = %stored.id,
            event_type = %stored.event_type,
            subject_id = ?stored.subject_id,
            "webhook event recorded"
        );

        self.attempt(&stored, event).await
    }

    async fn reprocess(
        &self,
        stored: &WebhookEvent,
        event: &KnownEvent,
    ) -> Result<ProcessedEvent, ProcessorError> {
        self.attempt(stored, event).await
    }
}

/// Apply one classified event to local state.
///
/// The match is total on purpose: adding a `KnownEvent` variant will
/// not compile until its handling is decided here.
async fn dispatch(
    tx: &mut dyn EventTransaction,
    event: &KnownEvent,
) -> Result<EventEffect, AppError> {
    match event {
        KnownEvent::UserCreated(profile) | KnownEvent::UserUpdated(profile) => {
            let user = tx.upsert_user(profile).await?;
            tracing::debug!(
                external_id = %profile.external_id,
                user_id = %user.id,
                "user profile synchronized"
            );
            Ok(EventEffect::UserUpserted)
        }
        KnownEvent::UserDeleted { external_id } => {
            let removed = tx.remove_user(external_id).await?;
            if !removed {
                tracing::warn!(external_id = %external_id, "user to delete was not tracked");
            }
            Ok(EventEffect::UserRemoved)
        }
        KnownEvent::SessionCreated(record) => {
            let user = tx
                .find_user_by_external_id(&record.user_external_id)
                .await?
                .ok_or_else(|| {
                    AppError::BusinessRule(format!(
                        "session {} references unknown user {}",
                        record.external_session_id, record.user_external_id
                    ))
                })?;

            tx.create_session(record, user.id).await?;
            Ok(EventEffect::SessionStarted)
        }
        KnownEvent::SessionEnded(session)
        | KnownEvent::SessionRemoved(session)
        | KnownEvent::SessionRevoked(session) => {
            let ended = tx.end_session(&session.external_session_id).await?;
            if ended {
                Ok(EventEffect::SessionEnded)
            } else {
                tracing::warn!(
                    external_session_id = %session.external_session_id,
                    "session to end was not tracked"
                );
                Ok(EventEffect::SessionMissing)
            }
        }
        KnownEvent::OrganizationCreated { external_id }
        | KnownEvent::OrganizationUpdated { external_id }
        | KnownEvent::OrganizationDeleted { external_id } => {
            tracing::debug!(organization_id = %external_id, "organization event acknowledged");
            Ok(EventEffect::Ignored)
        }
        KnownEvent::OrganizationMembershipCreated { organization_id }
        | KnownEvent::OrganizationMembershipUpdated { organization_id }
        | KnownEvent::OrganizationMembershipDeleted { organization_id } => {
            tracing::debug!(organization_id = %organization_id, "membership event acknowledged");
            Ok(EventEffect::Ignored)
        }
        KnownEvent::Unknown { event_type } => {
            tracing::info!(event_type = %event_type, "unrecognized event type, acknowledging");
            Ok(EventEffect::Ignored)
        }
    }
}

async fn rollback_quietly(tx: Box<dyn EventTransaction>, event_id: Uuid) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(event_id = %event_id, error = %e, "transaction rollback failed");
    }
}
