//! # Domain Layer
//!
//! The domain layer contains the core business logic of the webhook
//! ingestion service. It is independent of any external frameworks or
//! infrastructure concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (User, WebhookEvent, UserSession)
//! - **events**: Webhook envelope parsing and per-type payload validation
//! - **unit_of_work**: Transactional boundary for event processing
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Pure business logic and domain rules
//! - Repository traits define data access contracts
//! - Entities encapsulate domain behavior

pub mod entities;
pub mod events;
pub mod unit_of_work;

// Re-export commonly used types
pub use entities::*;
pub use events::{KnownEvent, SessionRecord, SessionRef, UserProfile, WebhookEnvelope};
pub use unit_of_work::{EventTransaction, UnitOfWork};
