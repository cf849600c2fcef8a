//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::warn;

use tally_core::{EventId, EventRecord};

use crate::error::Result;
use crate::traits::{AppendResult, Snapshot, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Records indexed by ID.
    events: HashMap<EventId, StoredRecord>,

    /// Position index: seq -> record ID.
    positions: BTreeMap<u64, EventId>,

    /// The latest snapshot.
    snapshot: Option<Snapshot>,
}

struct StoredRecord {
    record: EventRecord,
    canonical: Vec<u8>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                events: HashMap::new(),
                positions: BTreeMap::new(),
                snapshot: None,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn append_event(&self, record: &EventRecord, canonical: &[u8]) -> Result<AppendResult> {
        let mut inner = self.inner.write().unwrap();

        let event_id = record.compute_id();

        if inner.events.contains_key(&event_id) {
            return Ok(AppendResult::AlreadyExists);
        }

        if let Some(&existing) = inner.positions.get(&record.seq) {
            warn!(seq = record.seq, %existing, "journal conflict");
            return Ok(AppendResult::Conflict { existing });
        }

        inner.events.insert(
            event_id,
            StoredRecord {
                record: record.clone(),
                canonical: canonical.to_vec(),
            },
        );
        inner.positions.insert(record.seq, event_id);

        Ok(AppendResult::Appended)
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.events.get(id).map(|sr| sr.record.clone()))
    }

    async fn get_event_at(&self, seq: u64) -> Result<Option<EventRecord>> {
        let inner = self.inner.read().unwrap();

        if let Some(event_id) = inner.positions.get(&seq) {
            Ok(inner.events.get(event_id).map(|sr| sr.record.clone()))
        } else {
            Ok(None)
        }
    }

    async fn get_events_range(&self, start: u64, end: u64) -> Result<Vec<EventRecord>> {
        let inner = self.inner.read().unwrap();

        let records = inner
            .positions
            .range(start..=end)
            .filter_map(|(_, id)| inner.events.get(id))
            .map(|sr| sr.record.clone())
            .collect();

        Ok(records)
    }

    async fn has_event(&self, id: &EventId) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Ok(inner.events.contains_key(id))
    }

    async fn get_canonical_bytes(&self, id: &EventId) -> Result<Option<Vec<u8>>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.events.get(id).map(|sr| sr.canonical.clone()))
    }

    async fn head(&self) -> Result<Option<(u64, EventId)>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .positions
            .iter()
            .next_back()
            .map(|(&seq, &id)| (seq, id)))
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.snapshot = Some(snapshot.clone());
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.snapshot.clone())
    }
}
