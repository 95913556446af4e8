//! # Identity Sync Library
//!
//! This crate keeps a local user directory in step with an external
//! identity provider by consuming its webhook deliveries:
//! - Signed webhook ingestion with constant-time signature checks
//! - Two-pass event validation (envelope shape, then per-type payload)
//! - A persistent event ledger with transactional processing and retry
//! - Session lifecycle tracking with retention-based cleanup
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities and repository traits
//! - **Application Layer**: Business logic services and DTOs
//! - **Infrastructure Layer**: Database and metrics implementations
//! - **Presentation Layer**: HTTP handlers and middleware
//!
//! ## Module Structure
//!
//! ```text
//! identity_sync/
//! +-- config/        Configuration management
//! +-- domain/        Domain entities, webhook event model, and traits
//! +-- application/   Application services and DTOs
//! +-- infrastructure/ Database, unit of work, and metrics implementations
//! +-- presentation/  HTTP routes, handlers, and middleware
//! +-- shared/        Common utilities (errors, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers and middleware
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
