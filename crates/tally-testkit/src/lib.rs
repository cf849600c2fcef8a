//! # Tally Testkit
//!
//! Testing utilities for the Tally ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Helper structs for setting up ledger test scenarios
//! - **Generators**: Proptest strategies for property-based testing of the
//!   accounting invariants
//! - **Golden vectors**: Known records with derived canonical bytes and
//!   content addresses, for cross-implementation verification
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust,no_run
//! use tally_testkit::fixtures::TestFixture;
//!
//! # async fn example() {
//! let fixture = TestFixture::with_seed([7; 32]);
//! let kernel = fixture.kernel().await;
//! let treasury = fixture.account(1);
//! # }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use tally_core::Ledger;
//! use tally_testkit::generators::op_sequence;
//!
//! proptest! {
//!     #[test]
//!     fn supply_equals_balance_sum(ops in op_sequence(64)) {
//!         let mut ledger = Ledger::new();
//!         for op in &ops {
//!             let _ = ledger.apply(op);
//!         }
//!         prop_assert_eq!(ledger.computed_supply(), ledger.total_supply());
//!     }
//! }
//! ```
//!
//! ## Golden Vectors
//!
//! Golden vectors pin the canonical record encoding:
//!
//! ```rust
//! use tally_testkit::vectors::{all_vectors, record_from_vector};
//!
//! for vector in all_vectors() {
//!     let record = record_from_vector(&vector);
//!     println!("{}: {}", vector.name, record.compute_id());
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{make_chain, multi_party_accounts, random_account, TestFixture};
pub use generators::{account_id, amount, ledger_event, op_sequence, pool_account};
pub use vectors::{all_vectors, record_from_vector, GoldenVector};
