//! Webhook Handlers
//!
//! Receives identity-provider webhook deliveries. The body is taken as
//! raw bytes because the signature covers the exact payload as sent;
//! parsing happens only after the signature checks out.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};

use crate::application::dto::response::{WebhookAck, WebhookErrorBody};
use crate::application::services::{DeliveryMetadata, ProcessorError, SignatureHeaders};
use crate::domain::KnownEvent;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Receive one webhook delivery.
///
/// The delivery is acknowledged with 200 only after its ledger row has
/// been written and the business mutation committed (or skipped, for
/// event types this service does not track). Signature and validation
/// failures are rejected with 400 before anything is persisted.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, WebhookRejection> {
    let sig_headers = signature_headers(&headers);

    let envelope = state
        .verifier
        .verify(&sig_headers, &body)
        .map_err(|e| rejected(&sig_headers, e))?;

    let event = KnownEvent::classify(&envelope).map_err(|e| rejected(&sig_headers, e))?;

    let metadata = DeliveryMetadata {
        webhook_id: sig_headers.message_id.clone(),
        webhook_timestamp: delivery_timestamp(&sig_headers),
    };

    let processed = state.processor.ingest(&envelope, &event, &metadata).await?;

    Ok(Json(WebhookAck::from(processed)))
}

/// Pull the signature scheme headers out of the request.
///
/// The hosted delivery system sends `svix-*` names; self-hosted senders
/// use the `webhook-*` aliases. Missing headers stay None and fail
/// verification with a precise message instead of a generic 400.
fn signature_headers(headers: &HeaderMap) -> SignatureHeaders {
    SignatureHeaders {
        message_id: header_value(headers, "svix-id", "webhook-id"),
        timestamp: header_value(headers, "svix-timestamp", "webhook-timestamp"),
        signature: header_value(headers, "svix-signature", "webhook-signature"),
    }
}

fn header_value(headers: &HeaderMap, primary: &str, fallback: &str) -> Option<String> {
    headers
        .get(primary)
        .or_else(|| headers.get(fallback))
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// The timestamp header as a UTC instant. The verifier has already
/// bounded the skew, so a parse failure here only costs the audit field.
fn delivery_timestamp(sig_headers: &SignatureHeaders) -> Option<DateTime<Utc>> {
    sig_headers
        .timestamp
        .as_deref()
        .and_then(|t| t.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn rejected(sig_headers: &SignatureHeaders, error: AppError) -> WebhookRejection {
    if let AppError::SignatureInvalid(_) | AppError::Validation(_) = &error {
        tracing::warn!(
            webhook_id = sig_headers.message_id.as_deref().unwrap_or("unknown"),
            error = %error,
            "Webhook delivery rejected"
        );
    }
    WebhookRejection::from(error)
}

/// Route-local error rendering in the shape the delivery system expects.
#[derive(Debug)]
pub struct WebhookRejection {
    status: StatusCode,
    body: WebhookErrorBody,
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AppError> for WebhookRejection {
    fn from(error: AppError) -> Self {
        match error {
            AppError::SignatureInvalid(msg) | AppError::Validation(msg) => Self {
                status: StatusCode::BAD_REQUEST,
                body: WebhookErrorBody::new(msg),
            },
            error => {
                tracing::error!(error = %error, "Webhook processing error");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: WebhookErrorBody::new("Webhook processing failed"),
                }
            }
        }
    }
}

impl From<ProcessorError> for WebhookRejection {
    fn from(error: ProcessorError) -> Self {
        match error {
            ProcessorError::Bookkeeping(inner) => inner.into(),
            ProcessorError::Processing { event_id, message } => {
                tracing::error!(event_id = %event_id, error = %message, "Webhook processing failed");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: WebhookErrorBody::new("Webhook processing failed"),
                }
            }
        }
    }
}
