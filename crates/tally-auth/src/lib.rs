//! # Tally Auth
//!
//! The authorization layer gating supply changes on the Tally ledger.
//!
//! ## Overview
//!
//! The ledger core does not decide who may mint or burn; this crate does.
//! Authority is expressed as signed grants issued by a root principal and
//! replayed into an [`AuthorityState`]. Instead of mutable role flags, a
//! grant is an immutable payload; taking a capability away is a revocation,
//! not an edit.
//!
//! ## Key Concepts
//!
//! - **Grant**: gives a principal the right to mint, burn, or both
//! - **Revoke**: withdraws a previous grant by its content address
//! - **Conditions**: optional expiry and use limits on a grant
//! - **AuthorityState**: the replayed view answering "may this principal
//!   mint/burn right now?"
//!
//! The embedding kernel checks the state before invoking the core ledger;
//! the core itself never sees grants.

pub mod error;
pub mod grant;
pub mod state;

pub use error::{AuthError, Result};
pub use grant::{Conditions, GrantId, GrantPayload, RevokePayload, Right, SignedGrant, SignedRevoke};
pub use state::{AuthorityState, GrantStatus};
