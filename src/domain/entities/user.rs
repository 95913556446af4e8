//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema. Rows here are a
//! local projection of the identity provider's user records, kept in
//! sync by the webhook pipeline. The provider's user id is stored as
//! `external_id` and is the handle every webhook payload refers to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::AppError;

/// Represents a synchronized user account.
///
/// Maps to the `users` table:
/// - id: UUID PRIMARY KEY DEFAULT gen_random_uuid()
/// - external_id: VARCHAR(255) NOT NULL UNIQUE (provider user id)
/// - email: VARCHAR(255) NOT NULL (resolved primary address)
/// - first_name: VARCHAR(255) NULL
/// - last_name: VARCHAR(255) NULL
/// - username: VARCHAR(255) NULL
/// - image_url: TEXT NULL
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// - updated_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID primary key
    pub id: Uuid,

    /// Provider-issued user id (unique)
    pub external_id: String,

    /// Primary email address as resolved at ingestion time
    pub email: String,

    /// First name if the provider supplied one
    pub first_name: Option<String>,

    /// Last name if the provider supplied one
    pub last_name: Option<String>,

    /// Username if the provider supplied one
    pub username: Option<String>,

    /// URL to the user's profile image
    pub image_url: Option<String>,

    /// Row creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last synchronization timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Get a display name: full name, then username, then email.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self
                .username
                .clone()
                .unwrap_or_else(|| self.email.clone()),
        }
    }

    /// Create a new user projection.
    pub fn new(external_id: String, email: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id,
            email,
            first_name: None,
            last_name: None,
            username: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for User {
    fn default() -> Self {
        Self::new(String::new(), String::new())
    }
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual database interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
/// Writes to the `users` table happen exclusively inside the event
/// processing transaction, so this trait exposes the read surface only.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their UUID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Find a user by the provider-issued id.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>, AppError>;

    /// Check whether a provider id is already synchronized.
    async fn exists_by_external_id(&self, external_id: &str) -> Result<bool, AppError>;

    /// Count synchronized users.
    async fn count(&self) -> Result<i64, AppError>;
}
