//! # Tally Core
//!
//! Pure primitives for the Tally ledger: accounts, amounts, events, and the
//! balance state machine.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over in-memory ledger state.
//!
//! ## Key Types
//!
//! - [`Ledger`] - The balance table and supply counter, with the mint /
//!   burn / transfer state transitions
//! - [`AccountId`] - Opaque 32-byte account identifier ([`AccountId::ZERO`]
//!   is the reserved null account)
//! - [`LedgerEvent`] - The event record produced by each applied operation
//! - [`EventRecord`] - A journaled event: sequence number, timestamp, and
//!   hash-chain link
//! - [`EventId`] - Content-addressed record identifier (Blake3 hash)
//!
//! ## Invariant
//!
//! After every successful operation, `total_supply` equals the sum of all
//! account balances. Rejected operations change nothing.
//!
//! ## Canonicalization
//!
//! Journal records are encoded using deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod ledger;
pub mod types;
pub mod validation;

pub use canonical::{canonical_record_bytes, decode_record};
pub use crypto::{Blake3Hash, Keypair, PublicKey, Signature};
pub use error::{CodecError, CryptoError, LedgerError, ValidationError};
pub use event::{EventKind, EventRecord, LedgerEvent, RECORD_VERSION};
pub use ledger::Ledger;
pub use types::{AccountId, Amount, EventId};
pub use validation::validate_succession;
