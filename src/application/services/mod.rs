//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **SignatureVerifier**: Webhook signature verification and envelope parsing
//! - **EventProcessor**: Transactional processing of classified events
//! - **RetryService**: Replay of failed ledger rows
//! - **SessionService**: Session queries, activity touches, retention purging

pub mod event_processor;
pub mod retry_service;
pub mod session_service;
pub mod signature_verifier;

// Re-export signature verifier types
pub use signature_verifier::{HmacSignatureVerifier, SignatureHeaders, SignatureVerifier};

// Re-export event processor types
pub use event_processor::{
    DeliveryMetadata, EventEffect, EventProcessor, EventProcessorImpl, ProcessedEvent,
    ProcessorError,
};

// Re-export retry service types
pub use retry_service::{RetryError, RetryService, RetryServiceImpl};

// Re-export session service types
pub use session_service::{SessionService, SessionServiceImpl};
