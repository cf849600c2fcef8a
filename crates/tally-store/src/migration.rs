//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Journal: one row per committed ledger operation
        CREATE TABLE events (
            event_id BLOB PRIMARY KEY,        -- 32 bytes, Blake3 hash of canonical bytes
            seq INTEGER NOT NULL UNIQUE,      -- journal position (1-indexed)
            timestamp INTEGER NOT NULL,       -- commit timestamp (Unix ms, local)
            kind INTEGER NOT NULL,            -- EventKind as u16
            account BLOB NOT NULL,            -- 32 bytes, minted/burned account or transfer source
            counterparty BLOB,                -- 32 bytes, transfer destination (NULL otherwise)
            amount INTEGER NOT NULL,
            prev_event_id BLOB,               -- 32 bytes, nullable (NULL for seq=1)
            canonical_bytes BLOB NOT NULL,    -- cached canonical encoding
            appended_at INTEGER NOT NULL      -- local timestamp of append
        );

        -- Single-row snapshot of materialized ledger state
        CREATE TABLE snapshot (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            at_seq INTEGER NOT NULL,
            total_supply INTEGER NOT NULL,
            taken_at INTEGER NOT NULL
        );

        -- Balances belonging to the snapshot row
        CREATE TABLE snapshot_balances (
            account BLOB PRIMARY KEY,
            balance INTEGER NOT NULL
        );

        -- Indexes for common queries
        CREATE INDEX idx_events_account ON events(account);
        CREATE INDEX idx_events_kind ON events(kind);
        CREATE INDEX idx_events_timestamp ON events(timestamp);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"events".to_string()));
        assert!(tables.contains(&"snapshot".to_string()));
        assert!(tables.contains(&"snapshot_balances".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }
}
