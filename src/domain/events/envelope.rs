//! Webhook envelope parsing.
//!
//! The provider wraps every delivery in the same outer shape:
//! `{ "type": "...", "data": { ... }, "object": "event" }`. Parsing
//! checks only that outer shape; per-type payload validation happens
//! once the event type is known.

use serde_json::Value;

use crate::shared::error::AppError;

/// Parsed outer envelope of a webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    /// Event type tag, e.g. "user.created"
    pub event_type: String,

    /// Raw event payload, shape depends on the event type
    pub data: Value,

    /// Envelope discriminator as sent by the provider ("event")
    pub object: Option<String>,
}

impl WebhookEnvelope {
    /// Parse and shape-check a raw request body.
    ///
    /// All envelope violations are collected and reported together.
    pub fn parse(body: &[u8]) -> Result<Self, AppError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("body is not valid JSON: {}", e)))?;

        let root = value
            .as_object()
            .ok_or_else(|| AppError::Validation("body must be a JSON object".into()))?;

        let mut violations = Vec::new();

        let event_type = match root.get("type") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            Some(Value::String(_)) => {
                violations.push("type: must be a non-empty string".to_string());
                String::new()
            }
            Some(_) => {
                violations.push("type: must be a string".to_string());
                String::new()
            }
            None => {
                violations.push("type: is required".to_string());
                String::new()
            }
        };

        let data = match root.get("data") {
            Some(Value::Null) | None => {
                violations.push("data: is required".to_string());
                Value::Null
            }
            Some(d) => d.clone(),
        };

        if !violations.is_empty() {
            return Err(AppError::Validation(violations.join("; ")));
        }

        let object = root.get("object").and_then(Value::as_str).map(String::from);

        Ok(Self {
            event_type,
            data,
            object,
        })
    }
}
