//! Data Transfer Objects
//!
//! DTOs for API response serialization. Webhook requests arrive as raw
//! signed bytes, so there are no request DTOs; payload shapes live with
//! the domain event validation.

pub mod response;

pub use response::{WebhookAck, WebhookErrorBody};
