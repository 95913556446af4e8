//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - Transactional unit of work for event processing
//! - Prometheus metrics

pub mod database;
pub mod metrics;
pub mod repositories;
