//! Engine error model.
//!
//! Maps domain, store, and event-store failures into one taxonomy. Every
//! error is per-command and recoverable by retrying with corrected input;
//! nothing here is fatal at the process level. An availability shortfall is
//! deliberately absent: it becomes a backorder, not an error.

use thiserror::Error;

use stockbook_core::DomainError;

use crate::event_store::EventStoreError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Deterministic input rejection; nothing was mutated.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state machine or quantity invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Referenced item/order/line missing; the whole command is aborted.
    #[error("not found")]
    NotFound,

    /// Optimistic concurrency failure (stale item version). Retryable.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Entity store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Event-store append/read failure.
    #[error(transparent)]
    EventStore(#[from] EventStoreError),
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => EngineError::Validation(msg),
            DomainError::InvariantViolation(msg) => EngineError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => EngineError::Validation(msg),
            DomainError::NotFound => EngineError::NotFound,
            DomainError::Conflict(msg) => EngineError::Conflict(msg),
        }
    }
}
