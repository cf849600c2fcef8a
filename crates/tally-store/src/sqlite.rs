//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for the Tally ledger. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use tally_core::{AccountId, Amount, EventId, EventKind, EventRecord, LedgerEvent};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AppendResult, Snapshot, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(poisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| {
            StoreError::Io(std::io::Error::other(format!(
                "spawn_blocking failed: {}",
                e
            )))
        })?
    }
}

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::InvalidData(format!("connection mutex poisoned: {}", e))
}

// Helper to convert a row to an EventRecord
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRecord> {
    let seq: i64 = row.get("seq")?;
    let timestamp: i64 = row.get("timestamp")?;
    let kind_raw: u16 = row.get("kind")?;
    let account_bytes: Vec<u8> = row.get("account")?;
    let counterparty_bytes: Option<Vec<u8>> = row.get("counterparty")?;
    let amount: i64 = row.get("amount")?;
    let prev_bytes: Option<Vec<u8>> = row.get("prev_event_id")?;

    let blob_err =
        |idx: usize, name: &str| rusqlite::Error::InvalidColumnType(idx, name.into(), rusqlite::types::Type::Blob);

    let kind = EventKind::from_u16(kind_raw).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(3, "kind".into(), rusqlite::types::Type::Integer)
    })?;

    let account = AccountId::from_bytes(
        account_bytes
            .try_into()
            .map_err(|_| blob_err(4, "account"))?,
    );

    let counterparty = counterparty_bytes
        .map(|b| {
            b.try_into()
                .map(AccountId::from_bytes)
                .map_err(|_| blob_err(5, "counterparty"))
        })
        .transpose()?;

    let amount = amount as Amount;

    let event = match (kind, counterparty) {
        (EventKind::Mint, None) => LedgerEvent::Mint { account, amount },
        (EventKind::Burn, None) => LedgerEvent::Burn { account, amount },
        (EventKind::Transfer, Some(to)) => LedgerEvent::Transfer {
            from: account,
            to,
            amount,
        },
        _ => return Err(blob_err(5, "counterparty")),
    };

    let prev_event_id = prev_bytes
        .map(|b| {
            b.try_into()
                .map(EventId::from_bytes)
                .map_err(|_| blob_err(7, "prev_event_id"))
        })
        .transpose()?;

    Ok(EventRecord {
        seq: seq as u64,
        timestamp,
        event,
        prev_event_id,
    })
}

const SELECT_RECORD: &str = "SELECT seq, timestamp, kind, account, counterparty, amount, prev_event_id FROM events";

#[async_trait]
impl Store for SqliteStore {
    async fn append_event(&self, record: &EventRecord, canonical: &[u8]) -> Result<AppendResult> {
        let record = record.clone();
        let canonical = canonical.to_vec();

        self.blocking(move |conn| {
            let event_id = record.compute_id();

            // Check if the exact record already exists
            let existing_by_id: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT event_id FROM events WHERE event_id = ?1",
                    params![event_id.0.as_slice()],
                    |row| row.get(0),
                )
                .optional()?;

            if existing_by_id.is_some() {
                return Ok(AppendResult::AlreadyExists);
            }

            // Check for a different record at the same position
            let existing_at_seq: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT event_id FROM events WHERE seq = ?1",
                    params![record.seq as i64],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_bytes) = existing_at_seq {
                let existing = EventId::from_bytes(
                    existing_bytes
                        .try_into()
                        .map_err(|_| StoreError::InvalidData("bad event_id width".into()))?,
                );
                warn!(seq = record.seq, %existing, "journal conflict");
                return Ok(AppendResult::Conflict { existing });
            }

            conn.execute(
                "INSERT INTO events (
                    event_id, seq, timestamp, kind, account, counterparty,
                    amount, prev_event_id, canonical_bytes, appended_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    event_id.0.as_slice(),
                    record.seq as i64,
                    record.timestamp,
                    record.kind().to_u16() as i64,
                    record.event.account().as_bytes().as_slice(),
                    record.event.counterparty().map(|a| a.0.to_vec()),
                    record.event.amount() as i64,
                    record.prev_event_id.as_ref().map(|id| id.0.as_slice()),
                    canonical.as_slice(),
                    now_millis(),
                ],
            )?;

            Ok(AppendResult::Appended)
        })
        .await
    }

    async fn get_event(&self, id: &EventId) -> Result<Option<EventRecord>> {
        let id = *id;

        self.blocking(move |conn| {
            conn.query_row(
                &format!("{} WHERE event_id = ?1", SELECT_RECORD),
                params![id.0.as_slice()],
                row_to_record,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_event_at(&self, seq: u64) -> Result<Option<EventRecord>> {
        self.blocking(move |conn| {
            conn.query_row(
                &format!("{} WHERE seq = ?1", SELECT_RECORD),
                params![seq as i64],
                row_to_record,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn get_events_range(&self, start: u64, end: u64) -> Result<Vec<EventRecord>> {
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE seq >= ?1 AND seq <= ?2 ORDER BY seq",
                SELECT_RECORD
            ))?;

            let records = stmt
                .query_map(params![start as i64, end as i64], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
        .await
    }

    async fn has_event(&self, id: &EventId) -> Result<bool> {
        let id = *id;

        self.blocking(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM events WHERE event_id = ?1)",
                params![id.0.as_slice()],
                |row| row.get(0),
            )?;

            Ok(exists)
        })
        .await
    }

    async fn get_canonical_bytes(&self, id: &EventId) -> Result<Option<Vec<u8>>> {
        let id = *id;

        self.blocking(move |conn| {
            conn.query_row(
                "SELECT canonical_bytes FROM events WHERE event_id = ?1",
                params![id.0.as_slice()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn head(&self) -> Result<Option<(u64, EventId)>> {
        self.blocking(move |conn| {
            let row: Option<(i64, Vec<u8>)> = conn
                .query_row(
                    "SELECT seq, event_id FROM events ORDER BY seq DESC LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match row {
                Some((seq, id_bytes)) => {
                    let id = EventId::from_bytes(
                        id_bytes
                            .try_into()
                            .map_err(|_| StoreError::InvalidData("bad event_id width".into()))?,
                    );
                    Ok(Some((seq as u64, id)))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let snapshot = snapshot.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO snapshot (id, at_seq, total_supply, taken_at)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    at_seq = excluded.at_seq,
                    total_supply = excluded.total_supply,
                    taken_at = excluded.taken_at",
                params![
                    snapshot.at_seq as i64,
                    snapshot.total_supply as i64,
                    snapshot.taken_at,
                ],
            )?;

            tx.execute("DELETE FROM snapshot_balances", [])?;

            for (account, balance) in &snapshot.balances {
                tx.execute(
                    "INSERT INTO snapshot_balances (account, balance) VALUES (?1, ?2)",
                    params![account.as_bytes().as_slice(), *balance as i64],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        self.blocking(move |conn| {
            let row: Option<(i64, i64, i64)> = conn
                .query_row(
                    "SELECT at_seq, total_supply, taken_at FROM snapshot WHERE id = 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((at_seq, total_supply, taken_at)) = row else {
                return Ok(None);
            };

            let mut stmt = conn
                .prepare("SELECT account, balance FROM snapshot_balances ORDER BY account")?;
            let balances = stmt
                .query_map([], |row| {
                    let account_bytes: Vec<u8> = row.get(0)?;
                    let balance: i64 = row.get(1)?;
                    Ok((account_bytes, balance))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let balances = balances
                .into_iter()
                .map(|(bytes, balance)| {
                    let account = AccountId::from_bytes(
                        bytes
                            .try_into()
                            .map_err(|_| StoreError::InvalidData("bad account width".into()))?,
                    );
                    Ok((account, balance as Amount))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Some(Snapshot {
                at_seq: at_seq as u64,
                total_supply: total_supply as Amount,
                balances,
                taken_at,
            }))
        })
        .await
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
