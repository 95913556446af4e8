//! # Domain Entities
//!
//! Core domain entities representing the main business objects of the
//! webhook ingestion service. All entities map directly to their
//! corresponding database tables.
//!
//! ## Core Entities
//!
//! - **User**: Local projection of a provider user account, keyed by external id
//! - **WebhookEvent**: Durable ledger row for every accepted delivery
//! - **UserSession**: Tracked provider session with activity and lifecycle state
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer, following the
//! dependency inversion principle.

mod user;
mod user_session;
mod webhook_event;

// Re-export User entity and related types
pub use user::{User, UserRepository};

// Re-export WebhookEvent entity and related types
pub use webhook_event::{WebhookEvent, WebhookEventRepository, WebhookEventStatus};

// Re-export UserSession entity and related types
pub use user_session::{SessionStats, UserSession, UserSessionRepository};
