//! Error types for maildrip.

use uuid::Uuid;

/// Top-level error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Campaign start preconditions that the caller can correct.
///
/// Raised by `start`/`launch` before any state change; a validation failure
/// leaves the campaign exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Recipient table is empty")]
    NoRecipients,

    #[error("Subject template is empty")]
    EmptySubject,

    #[error("Body template is empty and not every recipient carries custom content")]
    EmptyBody,

    #[error("Recipient at row {row} has neither an `id` nor an `email` field")]
    MissingIdentityKey { row: usize },
}

/// Recipient list ingestion errors.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Recipient input is empty")]
    EmptyInput,

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome ledger invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Outcome already recorded for recipient key {key}")]
    DuplicateKey { key: String },
}

/// Campaign store lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Campaign {id} not found")]
    NotFound { id: Uuid },
}

/// Dispatch engine operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Campaign {id} already has an activation in flight")]
    ActivationInProgress { id: Uuid },

    #[error("Campaign {id} is {status}, not sending")]
    NotSending { id: Uuid, status: String },

    #[error("Campaign {id} cannot transition from {from} to {to}")]
    InvalidTransition { id: Uuid, from: String, to: String },

    #[error("Campaign {id} is {status}; configuration is only mutable while draft")]
    ConfigLocked { id: Uuid, status: String },
}

/// Per-recipient delivery failure.
///
/// Recorded in the outcome ledger as `Errored`; never aborts an activation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Delivery failed: {detail}")]
pub struct DeliveryFailure {
    /// Human-readable failure description.
    pub detail: String,
}

impl DeliveryFailure {
    /// Build a failure from any displayable detail.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
