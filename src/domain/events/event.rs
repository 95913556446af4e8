//! Classified webhook events.
//!
//! `KnownEvent` is the tagged union the processor dispatches on. Each
//! recognized event type gets its payload deserialized and validated
//! here; anything unrecognized becomes `Unknown` so new provider event
//! types flow through as acknowledged no-ops.

use chrono::{DateTime, Utc};
use serde_json::Value;
use validator::Validate;

use crate::shared::error::AppError;
use crate::shared::validation::collect_messages;

use super::envelope::WebhookEnvelope;
use super::payload::{
    DeletedObjectPayload, OrganizationEventPayload, OrganizationMembershipEventPayload,
    SessionEventPayload, UserEventPayload,
};

/// Clean user profile extracted from a `user.*` payload.
///
/// Required fields are guaranteed present once classification succeeds,
/// so downstream code carries no `Option` for them.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    /// Provider user id
    pub external_id: String,

    /// Resolved primary email address
    pub email: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub image_url: Option<String>,

    /// Provider-side account creation time
    pub created_at: DateTime<Utc>,

    /// Provider-side last update time
    pub updated_at: DateTime<Utc>,
}

/// Clean session-start record extracted from `session.created`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Provider session id
    pub external_session_id: String,

    /// Provider id of the owning user
    pub user_external_id: String,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,

    /// Compact provider context (client id, status, device details)
    pub metadata: Option<Value>,
}

/// Reference to an existing session, used by the end-of-life events.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRef {
    /// Provider session id
    pub external_session_id: String,

    /// Provider id of the owning user
    pub user_external_id: String,
}

/// A webhook event after type dispatch and payload validation.
#[derive(Debug, Clone, PartialEq)]
pub enum KnownEvent {
    UserCreated(UserProfile),
    UserUpdated(UserProfile),
    UserDeleted { external_id: String },
    SessionCreated(SessionRecord),
    SessionEnded(SessionRef),
    SessionRemoved(SessionRef),
    SessionRevoked(SessionRef),
    OrganizationCreated { external_id: String },
    OrganizationUpdated { external_id: String },
    OrganizationDeleted { external_id: String },
    OrganizationMembershipCreated { organization_id: String },
    OrganizationMembershipUpdated { organization_id: String },
    OrganizationMembershipDeleted { organization_id: String },
    Unknown { event_type: String },
}

impl KnownEvent {
    /// Classify a parsed envelope.
    pub fn classify(envelope: &WebhookEnvelope) -> Result<Self, AppError> {
        Self::from_parts(&envelope.event_type, &envelope.data)
    }

    /// Classify from an event type tag and its raw payload.
    ///
    /// This is the entry point the retry path uses, re-reading both
    /// values from a stored ledger row.
    pub fn from_parts(event_type: &str, data: &Value) -> Result<Self, AppError> {
        match event_type {
            "user.created" => Ok(Self::UserCreated(parse_user_profile(event_type, data)?)),
            "user.updated" => Ok(Self::UserUpdated(parse_user_profile(event_type, data)?)),
            "user.deleted" => {
                let payload: DeletedObjectPayload = decode(event_type, data)?;
                Ok(Self::UserDeleted {
                    external_id: payload.id,
                })
            }
            "session.created" => {
                let payload: SessionEventPayload = decode(event_type, data)?;
                Ok(Self::SessionCreated(session_record(payload)))
            }
            "session.ended" => Ok(Self::SessionEnded(parse_session_ref(event_type, data)?)),
            "session.removed" => Ok(Self::SessionRemoved(parse_session_ref(event_type, data)?)),
            "session.revoked" => Ok(Self::SessionRevoked(parse_session_ref(event_type, data)?)),
            "organization.created" => {
                let payload: OrganizationEventPayload = decode(event_type, data)?;
                Ok(Self::OrganizationCreated {
                    external_id: payload.id,
                })
            }
            "organization.updated" => {
                let payload: OrganizationEventPayload = decode(event_type, data)?;
                Ok(Self::OrganizationUpdated {
                    external_id: payload.id,
                })
            }
            "organization.deleted" => {
                let payload: DeletedObjectPayload = decode(event_type, data)?;
                Ok(Self::OrganizationDeleted {
                    external_id: payload.id,
                })
            }
            "organizationMembership.created" => {
                let payload: OrganizationMembershipEventPayload = decode(event_type, data)?;
                Ok(Self::OrganizationMembershipCreated {
                    organization_id: payload.organization.id,
                })
            }
            "organizationMembership.updated" => {
                let payload: OrganizationMembershipEventPayload = decode(event_type, data)?;
                Ok(Self::OrganizationMembershipUpdated {
                    organization_id: payload.organization.id,
                })
            }
            "organizationMembership.deleted" => {
                let payload: OrganizationMembershipEventPayload = decode(event_type, data)?;
                Ok(Self::OrganizationMembershipDeleted {
                    organization_id: payload.organization.id,
                })
            }
            other => Ok(Self::Unknown {
                event_type: other.to_string(),
            }),
        }
    }

    /// Provider id of the entity this event is about, for the ledger.
    ///
    /// User events point at the user, session events at the owning user,
    /// organization and membership events at the organization.
    pub fn subject_id(&self) -> Option<&str> {
        match self {
            Self::UserCreated(profile) | Self::UserUpdated(profile) => {
                Some(profile.external_id.as_str())
            }
            Self::UserDeleted { external_id } => Some(external_id.as_str()),
            Self::SessionCreated(record) => Some(record.user_external_id.as_str()),
            Self::SessionEnded(session)
            | Self::SessionRemoved(session)
            | Self::SessionRevoked(session) => Some(session.user_external_id.as_str()),
            Self::OrganizationCreated { external_id }
            | Self::OrganizationUpdated { external_id }
            | Self::OrganizationDeleted { external_id } => Some(external_id.as_str()),
            Self::OrganizationMembershipCreated { organization_id }
            | Self::OrganizationMembershipUpdated { organization_id }
            | Self::OrganizationMembershipDeleted { organization_id } => {
                Some(organization_id.as_str())
            }
            Self::Unknown { .. } => None,
        }
    }
}

/// Deserialize and validate a payload, aggregating every violation.
fn decode<T>(event_type: &str, data: &Value) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned + Validate,
{
    let payload: T = serde_json::from_value(data.clone())
        .map_err(|e| AppError::Validation(format!("{} payload is malformed: {}", event_type, e)))?;

    payload.validate().map_err(|errors| {
        let mut messages = collect_messages(&errors);
        messages.sort();
        AppError::Validation(format!(
            "{} payload invalid: {}",
            event_type,
            messages.join("; ")
        ))
    })?;

    Ok(payload)
}

fn parse_user_profile(event_type: &str, data: &Value) -> Result<UserProfile, AppError> {
    let payload: UserEventPayload = decode(event_type, data)?;

    let created_at = required_epoch_ms(event_type, "created_at", payload.created_at)?;
    let updated_at = required_epoch_ms(event_type, "updated_at", payload.updated_at)?;

    // Primary address by id when the pointer resolves, first entry
    // otherwise. Validation guarantees the list is non-empty.
    let email = payload
        .primary_email_address_id
        .as_ref()
        .and_then(|primary| payload.email_addresses.iter().find(|e| &e.id == primary))
        .or_else(|| payload.email_addresses.first())
        .map(|e| e.email_address.clone())
        .unwrap_or_default();

    Ok(UserProfile {
        external_id: payload.id,
        email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        username: payload.username,
        image_url: payload.image_url,
        created_at,
        updated_at,
    })
}

fn parse_session_ref(event_type: &str, data: &Value) -> Result<SessionRef, AppError> {
    let payload: SessionEventPayload = decode(event_type, data)?;
    Ok(SessionRef {
        external_session_id: payload.id,
        user_external_id: payload.user_id,
    })
}

fn session_record(payload: SessionEventPayload) -> SessionRecord {
    let activity = payload.latest_activity.unwrap_or_default();

    let user_agent = match (activity.browser_name, activity.browser_version) {
        (Some(name), Some(version)) => Some(format!("{} {}", name, version)),
        (Some(name), None) => Some(name),
        (None, _) => None,
    };

    let mut metadata = serde_json::Map::new();
    if let Some(v) = payload.client_id {
        metadata.insert("client_id".into(), Value::String(v));
    }
    if let Some(v) = payload.status {
        metadata.insert("status".into(), Value::String(v));
    }
    if let Some(v) = activity.device_type {
        metadata.insert("device_type".into(), Value::String(v));
    }
    if let Some(v) = activity.city {
        metadata.insert("city".into(), Value::String(v));
    }
    if let Some(v) = activity.country {
        metadata.insert("country".into(), Value::String(v));
    }
    if let Some(v) = activity.is_mobile {
        metadata.insert("is_mobile".into(), Value::Bool(v));
    }

    SessionRecord {
        external_session_id: payload.id,
        user_external_id: payload.user_id,
        ip_address: activity.ip_address,
        user_agent,
        metadata: if metadata.is_empty() {
            None
        } else {
            Some(Value::Object(metadata))
        },
    }
}

/// Convert a required millisecond epoch into a timestamp.
fn required_epoch_ms(
    event_type: &str,
    field: &str,
    value: Option<i64>,
) -> Result<DateTime<Utc>, AppError> {
    value
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "{} payload invalid: {} must be a valid epoch timestamp",
                event_type, field
            ))
        })
}
