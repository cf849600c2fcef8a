//! Error types for the Kernel.

use thiserror::Error;

use tally_auth::AuthError;
use tally_core::{CodecError, EventId, LedgerError, ValidationError};
use tally_store::StoreError;

/// Errors that can occur during Kernel operations.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Ledger state-transition error (insufficient balance, invalid
    /// recipient, overflow).
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Authority error.
    #[error("authority error: {0}")]
    Auth(#[from] AuthError),

    /// Journal succession error during replay.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Record codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Caller holds no valid grant for the requested operation.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// Conflict detected (different record at the same journal position).
    #[error("conflict at seq {seq}: existing record {existing}")]
    Conflict { seq: u64, existing: EventId },

    /// The persisted journal or snapshot is inconsistent.
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
