//! Application Layer
//!
//! Services that drive the webhook pipeline (verification, processing,
//! retry, session upkeep) and the DTOs the HTTP surface serializes.

pub mod dto;
pub mod services;
