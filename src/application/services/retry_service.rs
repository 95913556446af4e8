//! Event Retry / Replay
//!
//! Replays failed ledger rows through the processor. A retry never
//! creates a new row: the stored row moves to `retrying`, its attempt
//! counter increments, and the stored payload is re-validated and
//! re-dispatched exactly like a fresh delivery.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::{WebhookEventRepository, WebhookEventStatus};
use crate::domain::events::KnownEvent;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

use super::event_processor::{EventProcessor, ProcessedEvent, ProcessorError};

/// Retry errors
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    #[error("Event {0} not found")]
    NotFound(Uuid),

    #[error("Event {event_id} is not retryable: {reason}")]
    NotRetryable { event_id: Uuid, reason: String },

    #[error(transparent)]
    Processing(#[from] ProcessorError),

    #[error("Retry bookkeeping failed: {0}")]
    Internal(AppError),
}

/// Retry service trait for dependency injection
#[async_trait]
pub trait RetryService: Send + Sync {
    /// Replay a failed event by ledger row id.
    async fn retry_event(&self, event_id: Uuid) -> Result<ProcessedEvent, RetryError>;
}

/// RetryService implementation
pub struct RetryServiceImpl<R, P>
where
    R: WebhookEventRepository,
    P: EventProcessor,
{
    events: Arc<R>,
    processor: Arc<P>,
    max_retries: i32,
}

impl<R, P> RetryServiceImpl<R, P>
where
    R: WebhookEventRepository,
    P: EventProcessor,
{
    /// Create a new RetryServiceImpl
    pub fn new(events: Arc<R>, processor: Arc<P>, max_retries: i32) -> Self {
        Self {
            events,
            processor,
            max_retries,
        }
    }
}

#[async_trait]
impl<R, P> RetryService for RetryServiceImpl<R, P>
where
    R: WebhookEventRepository + 'static,
    P: EventProcessor + 'static,
{
    async fn retry_event(&self, event_id: Uuid) -> Result<ProcessedEvent, RetryError> {
        let event = self
            .events
            .find_by_id(event_id)
            .await
            .map_err(RetryError::Internal)?
            .ok_or(RetryError::NotFound(event_id))?;

        if !event.is_retryable(self.max_retries) {
            let reason = if event.status != WebhookEventStatus::Failed {
                format!("status is {}", event.status)
            } else {
                format!(
                    "retry limit reached ({}/{})",
                    event.retry_count, self.max_retries
                )
            };
            return Err(RetryError::NotRetryable { event_id, reason });
        }

        let event = self
            .events
            .mark_retrying(event_id)
            .await
            .map_err(RetryError::Internal)?;

        metrics::record_webhook_retry(&event.event_type);
        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            attempt = event.retry_count,
            "retrying webhook event"
        );

        // The stored payload passed validation at ingestion time, but it
        // is re-checked here so a replay can never bypass the pipeline.
        let classified = match KnownEvent::from_parts(&event.event_type, &event.payload) {
            Ok(classified) => classified,
            Err(e) => {
                let message = e.to_string();
                if let Err(mark_err) = self.events.mark_failed(event.id, &message).await {
                    tracing::error!(
                        event_id = %event.id,
                        error = %mark_err,
                        "could not record replay validation failure"
                    );
                }
                return Err(RetryError::Processing(ProcessorError::Processing {
                    event_id: event.id,
                    message,
                }));
            }
        };

        Ok(self.processor.reprocess(&event, &classified).await?)
    }
}
