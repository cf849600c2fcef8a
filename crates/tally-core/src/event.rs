//! Ledger events: the records produced by mint, burn, and transfer.
//!
//! An event is immutable once journaled. The journal is an append-only log
//! of [`EventRecord`]s; each record chains to the previous one by content
//! address.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_record_bytes;
use crate::crypto::Blake3Hash;
use crate::types::{AccountId, Amount, EventId};

/// The current journal record schema version.
pub const RECORD_VERSION: u8 = 0;

/// The kind of ledger event, with stable wire discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EventKind {
    /// New supply credited to an account.
    Mint = 0x0001,
    /// Existing supply debited from an account and destroyed.
    Burn = 0x0002,
    /// Balance moved between two accounts; supply unchanged.
    Transfer = 0x0003,
}

impl EventKind {
    /// Convert to u16 for serialization.
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Try to parse from u16.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Mint),
            0x0002 => Some(Self::Burn),
            0x0003 => Some(Self::Transfer),
            _ => None,
        }
    }

    /// Whether this kind changes the total supply.
    pub fn changes_supply(self) -> bool {
        matches!(self, Self::Mint | Self::Burn)
    }
}

/// An applied ledger operation, as reported to external observers.
///
/// These are the three event record shapes the ledger produces. The core
/// only produces them; delivery belongs to the embedding layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Supply was created and credited to `account`.
    Mint { account: AccountId, amount: Amount },
    /// Supply was debited from `account` and destroyed.
    Burn { account: AccountId, amount: Amount },
    /// `amount` moved from `from` to `to`.
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Get the event kind.
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::Mint { .. } => EventKind::Mint,
            LedgerEvent::Burn { .. } => EventKind::Burn,
            LedgerEvent::Transfer { .. } => EventKind::Transfer,
        }
    }

    /// The primary account: the minted/burned account, or the transfer source.
    pub fn account(&self) -> AccountId {
        match *self {
            LedgerEvent::Mint { account, .. } => account,
            LedgerEvent::Burn { account, .. } => account,
            LedgerEvent::Transfer { from, .. } => from,
        }
    }

    /// The counterparty account: the transfer destination, if any.
    pub fn counterparty(&self) -> Option<AccountId> {
        match *self {
            LedgerEvent::Transfer { to, .. } => Some(to),
            _ => None,
        }
    }

    /// The amount moved, created, or destroyed.
    pub fn amount(&self) -> Amount {
        match *self {
            LedgerEvent::Mint { amount, .. } => amount,
            LedgerEvent::Burn { amount, .. } => amount,
            LedgerEvent::Transfer { amount, .. } => amount,
        }
    }
}

/// A journaled ledger event.
///
/// Records are 1-indexed and contiguous: record `n+1` carries the content
/// address of record `n` in `prev_event_id` (`None` only for `seq == 1`).
/// The timestamp is informational local time; ordering authority is `seq`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the journal (1-indexed).
    pub seq: u64,

    /// Local timestamp when the operation committed (Unix ms). Untrusted.
    pub timestamp: i64,

    /// The applied operation.
    pub event: LedgerEvent,

    /// Content address of the previous record (None iff seq == 1).
    pub prev_event_id: Option<EventId>,
}

impl EventRecord {
    /// Create a new record.
    pub fn new(seq: u64, timestamp: i64, event: LedgerEvent, prev_event_id: Option<EventId>) -> Self {
        Self {
            seq,
            timestamp,
            event,
            prev_event_id,
        }
    }

    /// Compute the record ID (Blake3 hash of canonical bytes).
    pub fn compute_id(&self) -> EventId {
        let bytes = canonical_record_bytes(self);
        EventId(Blake3Hash::hash(&bytes).0)
    }

    /// Get the event kind.
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 32])
    }

    #[test]
    fn test_event_kind_roundtrip() {
        for kind in [EventKind::Mint, EventKind::Burn, EventKind::Transfer] {
            let value = kind.to_u16();
            assert_eq!(EventKind::from_u16(value), Some(kind));
        }
        assert_eq!(EventKind::from_u16(0x0000), None);
        assert_eq!(EventKind::from_u16(0x0004), None);
    }

    #[test]
    fn test_kind_supply_effect() {
        assert!(EventKind::Mint.changes_supply());
        assert!(EventKind::Burn.changes_supply());
        assert!(!EventKind::Transfer.changes_supply());
    }

    #[test]
    fn test_event_accessors() {
        let mint = LedgerEvent::Mint {
            account: account(1),
            amount: 100,
        };
        assert_eq!(mint.kind(), EventKind::Mint);
        assert_eq!(mint.account(), account(1));
        assert_eq!(mint.counterparty(), None);
        assert_eq!(mint.amount(), 100);

        let transfer = LedgerEvent::Transfer {
            from: account(1),
            to: account(2),
            amount: 42,
        };
        assert_eq!(transfer.account(), account(1));
        assert_eq!(transfer.counterparty(), Some(account(2)));
    }

    #[test]
    fn test_record_id_deterministic() {
        let record = EventRecord::new(
            1,
            1736870400000,
            LedgerEvent::Mint {
                account: account(7),
                amount: 1_000,
            },
            None,
        );
        assert_eq!(record.compute_id(), record.compute_id());
    }

    #[test]
    fn test_record_id_depends_on_content() {
        let base = EventRecord::new(
            2,
            1736870400000,
            LedgerEvent::Burn {
                account: account(7),
                amount: 20,
            },
            Some(EventId::from_bytes([0xaa; 32])),
        );

        let mut other = base.clone();
        other.event = LedgerEvent::Burn {
            account: account(7),
            amount: 21,
        };
        assert_ne!(base.compute_id(), other.compute_id());

        let mut reseq = base.clone();
        reseq.seq = 3;
        assert_ne!(base.compute_id(), reseq.compute_id());
    }

    #[test]
    fn test_record_serde_json() {
        let record = EventRecord::new(
            4,
            1736870400000,
            LedgerEvent::Transfer {
                from: account(1),
                to: account(2),
                amount: 100,
            },
            Some(EventId::from_bytes([0xcd; 32])),
        );

        let json = serde_json::to_string(&record).unwrap();
        let recovered: EventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, recovered);
    }
}
