//! # Tally
//!
//! The unified API for the Tally fungible-token ledger.
//!
//! ## Overview
//!
//! Tally tracks ownership of a divisible, countable asset across accounts
//! and keeps one invariant above all others: the total supply equals the
//! sum of all balances, before and after every operation.
//!
//! The [`LedgerKernel`] brings the pieces together:
//!
//! - **Core**: the pure balance state machine ([`Ledger`])
//! - **Journal**: every committed operation is one hash-chained record in
//!   an append-only log behind the [`Store`] trait
//! - **Authority**: signed grants decide who may mint or burn
//! - **Events**: committed records are broadcast to subscribers
//!
//! ## Key Concepts
//!
//! - **Operations are atomic**: an operation either commits as one record
//!   or fails with no state change.
//! - **The journal is the truth**: reopening a kernel replays the journal
//!   (from the latest snapshot) and reproduces the exact balance state.
//! - **Callers are identities, not connections**: the embedding transport
//!   layer authenticates callers and passes their identity in; the kernel
//!   never authenticates.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tally::{AccountId, KernelConfig, LedgerKernel, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let kernel = LedgerKernel::open(store, KernelConfig::default())
//!         .await
//!         .unwrap();
//!
//!     let treasury = AccountId::from_bytes([0x11; 32]);
//!     let caller = tally::Keypair::generate().public_key();
//!
//!     let record = kernel.mint(&caller, treasury, 1_000_000).await.unwrap();
//!     assert_eq!(kernel.balance_of(&treasury).await, 1_000_000);
//!     assert_eq!(record.seq, 1);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `tally::core` - Core primitives (Ledger, AccountId, events)
//! - `tally::store` - Storage abstraction and SQLite
//! - `tally::auth` - Grants and authority state

pub mod error;
pub mod kernel;

// Re-export component crates
pub use tally_auth as auth;
pub use tally_core as core;
pub use tally_store as store;

// Re-export main types for convenience
pub use error::{KernelError, Result};
pub use kernel::{KernelConfig, LedgerKernel};

// Re-export commonly used component types
pub use tally_auth::{
    AuthorityState, Conditions, GrantId, GrantPayload, RevokePayload, Right, SignedGrant,
    SignedRevoke,
};
pub use tally_core::{
    AccountId, Amount, EventId, EventKind, EventRecord, Keypair, Ledger, LedgerEvent, PublicKey,
};
pub use tally_store::{AppendResult, MemoryStore, Snapshot, SqliteStore, Store};
