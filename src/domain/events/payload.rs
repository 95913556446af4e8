//! Per-event-type payload shapes.
//!
//! Deserialized from the envelope's `data` object after the event type
//! is known. Required fields use `serde(default)` so that a missing
//! value surfaces as a validation message instead of a deserialization
//! error; everything the provider may omit is an `Option`.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// One entry of a user's `email_addresses` list.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct EmailAddressPayload {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email_address: String,
}

/// Payload of `user.created` and `user.updated`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserEventPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "User id must be a non-empty string"))]
    pub id: String,

    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one email address is required"),
        nested
    )]
    pub email_addresses: Vec<EmailAddressPayload>,

    pub primary_email_address_id: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub username: Option<String>,

    pub image_url: Option<String>,

    #[validate(
        required(message = "Creation timestamp is required"),
        range(min = 0, message = "Creation timestamp must be a non-negative epoch value")
    )]
    pub created_at: Option<i64>,

    #[validate(
        required(message = "Update timestamp is required"),
        range(min = 0, message = "Update timestamp must be a non-negative epoch value")
    )]
    pub updated_at: Option<i64>,
}

/// Payload of `user.deleted` and `organization.deleted`.
///
/// The provider sends a deleted-object stub, not the full record, so
/// only the id is required.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DeletedObjectPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Id must be a non-empty string"))]
    pub id: String,

    #[serde(default)]
    pub deleted: bool,
}

/// Client activity details nested under a session payload.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SessionActivityPayload {
    pub ip_address: Option<String>,

    pub browser_name: Option<String>,

    pub browser_version: Option<String>,

    pub device_type: Option<String>,

    pub city: Option<String>,

    pub country: Option<String>,

    pub is_mobile: Option<bool>,
}

/// Payload of the `session.*` lifecycle events.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SessionEventPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Session id must be a non-empty string"))]
    pub id: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "User id must be a non-empty string"))]
    pub user_id: String,

    pub client_id: Option<String>,

    pub status: Option<String>,

    #[validate(range(min = 0, message = "Creation timestamp must be a non-negative epoch value"))]
    pub created_at: Option<i64>,

    #[validate(range(min = 0, message = "Update timestamp must be a non-negative epoch value"))]
    pub updated_at: Option<i64>,

    #[validate(range(min = 0, message = "Expiry timestamp must be a non-negative epoch value"))]
    pub expire_at: Option<i64>,

    #[validate(range(min = 0, message = "Abandon timestamp must be a non-negative epoch value"))]
    pub abandon_at: Option<i64>,

    #[validate(range(min = 0, message = "Activity timestamp must be a non-negative epoch value"))]
    pub last_active_at: Option<i64>,

    #[validate(nested)]
    pub latest_activity: Option<SessionActivityPayload>,
}

/// Payload of `organization.created` and `organization.updated`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrganizationEventPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Organization id must be a non-empty string"))]
    pub id: String,

    pub name: Option<String>,

    pub slug: Option<String>,

    #[validate(range(min = 0, message = "Creation timestamp must be a non-negative epoch value"))]
    pub created_at: Option<i64>,

    #[validate(range(min = 0, message = "Update timestamp must be a non-negative epoch value"))]
    pub updated_at: Option<i64>,
}

/// Organization reference nested under a membership payload.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrganizationRefPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Organization id must be a non-empty string"))]
    pub id: String,
}

/// Payload of the `organizationMembership.*` events.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct OrganizationMembershipEventPayload {
    #[serde(default)]
    #[validate(length(min = 1, message = "Membership id must be a non-empty string"))]
    pub id: String,

    #[serde(default)]
    #[validate(nested)]
    pub organization: OrganizationRefPayload,
}
