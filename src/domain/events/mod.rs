//! # Webhook Events
//!
//! Parsing and validation of incoming webhook deliveries, in two passes:
//!
//! 1. **envelope**: the outer `{type, data, object}` shape every
//!    delivery shares.
//! 2. **payload** / **event**: the per-type `data` shape, dispatched on
//!    the type tag into the `KnownEvent` union. Unrecognized types
//!    classify as `KnownEvent::Unknown` and are acknowledged without
//!    touching storage.

mod envelope;
mod event;
mod payload;

pub use envelope::WebhookEnvelope;
pub use event::{KnownEvent, SessionRecord, SessionRef, UserProfile};
pub use payload::{
    DeletedObjectPayload, EmailAddressPayload, OrganizationEventPayload,
    OrganizationMembershipEventPayload, OrganizationRefPayload, SessionActivityPayload,
    SessionEventPayload, UserEventPayload,
};
