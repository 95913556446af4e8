//! Response DTOs
//!
//! Data structures for API response bodies. The webhook acknowledgement
//! shape is part of the provider-facing contract and uses camelCase
//! field names.

use serde::Serialize;

use crate::application::services::ProcessedEvent;

/// Acknowledgement returned for an accepted webhook delivery.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub message: String,
    pub event_type: String,
}

impl From<ProcessedEvent> for WebhookAck {
    fn from(receipt: ProcessedEvent) -> Self {
        Self {
            success: true,
            message: "Webhook processed successfully".to_string(),
            event_type: receipt.event_type,
        }
    }
}

/// Error body returned for a rejected or failed delivery.
#[derive(Debug, Serialize)]
pub struct WebhookErrorBody {
    pub success: bool,
    pub error: String,
}

impl WebhookErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
