//! Store trait: the abstract interface for journal persistence.
//!
//! This trait keeps the kernel storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tally_core::{AccountId, Amount, EventId, EventRecord};

use crate::error::Result;

/// Result of appending a record to the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendResult {
    /// Record was appended successfully.
    Appended,
    /// Record already exists (idempotent - not an error).
    AlreadyExists,
    /// Conflict: a different record occupies the same sequence number.
    Conflict {
        /// The existing record ID at this position.
        existing: EventId,
    },
}

/// Materialized ledger state at a journal position.
///
/// Restoring from a snapshot and replaying records after `at_seq` yields
/// the same state as replaying the full journal. Balances are kept sorted
/// by account so two snapshots of the same state compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The journal position the snapshot covers (0 for an empty journal).
    pub at_seq: u64,

    /// The supply counter at `at_seq`.
    pub total_supply: Amount,

    /// All non-zero balances at `at_seq`, sorted by account.
    pub balances: Vec<(AccountId, Amount)>,

    /// When the snapshot was taken (Unix ms, local).
    pub taken_at: i64,
}

impl Snapshot {
    /// Build a snapshot, sorting the balance entries.
    pub fn new(
        at_seq: u64,
        total_supply: Amount,
        mut balances: Vec<(AccountId, Amount)>,
        taken_at: i64,
    ) -> Self {
        balances.sort_by_key(|(account, _)| *account);
        Self {
            at_seq,
            total_supply,
            balances,
            taken_at,
        }
    }
}

/// The Store trait: async interface for journal persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, `spawn_blocking` is used internally to avoid blocking the
/// runtime.
///
/// # Design Notes
///
/// - **Idempotent appends**: Appending the same record twice returns
///   `AlreadyExists`.
/// - **Conflict detection**: Appending a different record at an occupied
///   sequence number returns `Conflict` with the existing record ID.
/// - **Single log**: there is one journal per store; `seq` alone addresses
///   a position.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Journal Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append a record to the journal.
    ///
    /// # Arguments
    /// - `record`: The record to append.
    /// - `canonical`: The canonical bytes (cached to avoid recomputation).
    async fn append_event(&self, record: &EventRecord, canonical: &[u8]) -> Result<AppendResult>;

    /// Get a record by its content-addressed ID.
    async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>>;

    /// Get a record by its journal position.
    async fn get_event_at(&self, seq: u64) -> Result<Option<EventRecord>>;

    /// Get a range of records, `start <= seq <= end`, ordered by seq.
    async fn get_events_range(&self, start: u64, end: u64) -> Result<Vec<EventRecord>>;

    /// Check if a record exists by ID.
    async fn has_event(&self, id: &EventId) -> Result<bool>;

    /// Get the canonical bytes for a record (if cached).
    async fn get_canonical_bytes(&self, id: &EventId) -> Result<Option<Vec<u8>>>;

    /// The journal head: highest sequence number and its record ID.
    async fn head(&self) -> Result<Option<(u64, EventId)>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshot Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a snapshot, replacing any previous one.
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// Load the most recent snapshot, if any.
    async fn load_snapshot(&self) -> Result<Option<Snapshot>>;
}
