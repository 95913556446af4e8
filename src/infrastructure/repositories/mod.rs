//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! This module provides concrete implementations of the repository traits
//! defined in the domain layer. Each repository handles data access for
//! a specific entity type.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - read access to the mirrored user directory
//! - **WebhookEventRepository** - the webhook event ledger
//! - **UserSessionRepository** - tracked session lifecycle rows
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{
//!     PgUserRepository, PgUserSessionRepository, PgWebhookEventRepository,
//! };
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let event_repo = PgWebhookEventRepository::new(pool.clone());
//!     let session_repo = PgUserSessionRepository::new(pool.clone());
//! }
//! ```

pub mod session_repository;
pub mod user_repository;
pub mod webhook_event_repository;

pub use session_repository::PgUserSessionRepository;
pub use user_repository::PgUserRepository;
pub use webhook_event_repository::PgWebhookEventRepository;
