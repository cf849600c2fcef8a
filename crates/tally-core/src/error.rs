//! Error types for the Tally core.

use thiserror::Error;

use crate::types::{AccountId, EventId};

/// Errors raised by ledger state transitions.
///
/// Every variant is detected before any mutation is applied: a failed
/// operation leaves every balance and the supply counter unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance on {account}: available {balance}, required {required}")]
    InsufficientBalance {
        account: AccountId,
        balance: u64,
        required: u64,
    },

    #[error("recipient is the null account")]
    InvalidRecipient,

    #[error("amount would overflow the supply counter")]
    Overflow,
}

/// Errors raised while encoding or decoding journal records.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unsupported record version: {0}")]
    UnsupportedVersion(u8),

    #[error("unknown event kind: {0}")]
    UnknownKind(u16),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Errors raised when a record does not extend the journal head.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid sequence number: expected {expected}, got {got}")]
    InvalidSequence { expected: u64, got: u64 },

    #[error("invalid prev_event_id: expected {expected:?}, got {got:?}")]
    InvalidPrevEvent {
        expected: Option<EventId>,
        got: Option<EventId>,
    },
}

/// Errors raised by signature operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,
}
