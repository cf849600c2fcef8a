//! Canonical CBOR encoding for journal records.
//!
//! Implements RFC 8949 Core Deterministic Encoding:
//! - Integer map keys, emitted in ascending order
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! The canonical encoding is critical: the same record must produce
//! identical bytes (and thus an identical [`EventId`]) on every platform.
//! Unlike a generic CBOR writer, records have a fixed field set, so fields
//! are emitted directly in key order with no sorting pass.

use ciborium::value::Value;

use crate::error::CodecError;
use crate::event::{EventKind, EventRecord, LedgerEvent, RECORD_VERSION};
use crate::types::{AccountId, EventId};

/// Record field keys. Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const SEQ: u64 = 1;
    pub const TIMESTAMP: u64 = 2;
    pub const KIND: u64 = 3;
    pub const ACCOUNT: u64 = 4;
    pub const COUNTERPARTY: u64 = 5;
    pub const AMOUNT: u64 = 6;
    pub const PREV_EVENT_ID: u64 = 7;
}

const CBOR_NULL: u8 = 0xf6;

/// Encode a journal record to canonical CBOR bytes.
pub fn canonical_record_bytes(record: &EventRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);

    // Map header: 8 entries, keys 0..=7 written in ascending order.
    encode_uint(&mut buf, 5, 8);

    encode_uint(&mut buf, 0, keys::VERSION);
    encode_uint(&mut buf, 0, RECORD_VERSION as u64);

    encode_uint(&mut buf, 0, keys::SEQ);
    encode_uint(&mut buf, 0, record.seq);

    encode_uint(&mut buf, 0, keys::TIMESTAMP);
    encode_i64(&mut buf, record.timestamp);

    encode_uint(&mut buf, 0, keys::KIND);
    encode_uint(&mut buf, 0, record.kind().to_u16() as u64);

    encode_uint(&mut buf, 0, keys::ACCOUNT);
    encode_bytes(&mut buf, record.event.account().as_bytes());

    encode_uint(&mut buf, 0, keys::COUNTERPARTY);
    match record.event.counterparty() {
        Some(to) => encode_bytes(&mut buf, to.as_bytes()),
        None => buf.push(CBOR_NULL),
    }

    encode_uint(&mut buf, 0, keys::AMOUNT);
    encode_uint(&mut buf, 0, record.event.amount());

    encode_uint(&mut buf, 0, keys::PREV_EVENT_ID);
    match &record.prev_event_id {
        Some(id) => encode_bytes(&mut buf, id.as_bytes()),
        None => buf.push(CBOR_NULL),
    }

    buf
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_i64(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Decode a journal record from canonical bytes.
pub fn decode_record(bytes: &[u8]) -> Result<EventRecord, CodecError> {
    let cursor = std::io::Cursor::new(bytes);
    let value: Value =
        ciborium::from_reader(cursor).map_err(|e| CodecError::DecodingError(e.to_string()))?;

    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CodecError::MalformedRecord("expected map".into())),
    };

    let get = |key: u64| -> Option<&Value> {
        map.iter()
            .find(|(k, _)| matches!(k, Value::Integer(i) if i128::from(*i) == key as i128))
            .map(|(_, v)| v)
    };

    let version = get_u64(get(keys::VERSION), "version")? as u8;
    if version != RECORD_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let seq = get_u64(get(keys::SEQ), "seq")?;
    let timestamp = get_i64(get(keys::TIMESTAMP), "timestamp")?;

    let kind_raw = u16::try_from(get_u64(get(keys::KIND), "kind")?)
        .map_err(|_| CodecError::MalformedRecord("kind out of range".into()))?;
    let kind = EventKind::from_u16(kind_raw).ok_or(CodecError::UnknownKind(kind_raw))?;

    let account = AccountId::from_bytes(get_bytes32(get(keys::ACCOUNT), "account")?);
    let counterparty = get_optional_bytes32(get(keys::COUNTERPARTY), "counterparty")?
        .map(AccountId::from_bytes);
    let amount = get_u64(get(keys::AMOUNT), "amount")?;
    let prev_event_id =
        get_optional_bytes32(get(keys::PREV_EVENT_ID), "prev_event_id")?.map(EventId::from_bytes);

    let event = match (kind, counterparty) {
        (EventKind::Mint, None) => LedgerEvent::Mint { account, amount },
        (EventKind::Burn, None) => LedgerEvent::Burn { account, amount },
        (EventKind::Transfer, Some(to)) => LedgerEvent::Transfer {
            from: account,
            to,
            amount,
        },
        (EventKind::Transfer, None) => {
            return Err(CodecError::MalformedRecord(
                "transfer requires a counterparty".into(),
            ))
        }
        (_, Some(_)) => {
            return Err(CodecError::MalformedRecord(
                "counterparty only valid on transfer".into(),
            ))
        }
    };

    Ok(EventRecord {
        seq,
        timestamp,
        event,
        prev_event_id,
    })
}

fn get_u64(value: Option<&Value>, field: &str) -> Result<u64, CodecError> {
    match value {
        Some(Value::Integer(i)) => {
            let n: i128 = i128::from(*i);
            u64::try_from(n)
                .map_err(|_| CodecError::MalformedRecord(format!("{} out of range", field)))
        }
        _ => Err(CodecError::MalformedRecord(format!("missing {}", field))),
    }
}

fn get_i64(value: Option<&Value>, field: &str) -> Result<i64, CodecError> {
    match value {
        Some(Value::Integer(i)) => {
            let n: i128 = i128::from(*i);
            i64::try_from(n)
                .map_err(|_| CodecError::MalformedRecord(format!("{} out of range", field)))
        }
        _ => Err(CodecError::MalformedRecord(format!("missing {}", field))),
    }
}

fn get_bytes32(value: Option<&Value>, field: &str) -> Result<[u8; 32], CodecError> {
    match value {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            Ok(arr)
        }
        _ => Err(CodecError::MalformedRecord(format!("invalid {}", field))),
    }
}

fn get_optional_bytes32(value: Option<&Value>, field: &str) -> Result<Option<[u8; 32]>, CodecError> {
    match value {
        Some(Value::Bytes(b)) if b.len() == 32 => {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(b);
            Ok(Some(arr))
        }
        Some(Value::Null) | None => Ok(None),
        _ => Err(CodecError::MalformedRecord(format!("invalid {}", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn account(byte: u8) -> AccountId {
        AccountId::from_bytes([byte; 32])
    }

    fn sample_records() -> Vec<EventRecord> {
        vec![
            EventRecord::new(
                1,
                1736870400000,
                LedgerEvent::Mint {
                    account: account(1),
                    amount: 1_000_000_000_000_000_000,
                },
                None,
            ),
            EventRecord::new(
                2,
                1736870400001,
                LedgerEvent::Burn {
                    account: account(1),
                    amount: 20,
                },
                Some(EventId::from_bytes([0xaa; 32])),
            ),
            EventRecord::new(
                3,
                1736870400002,
                LedgerEvent::Transfer {
                    from: account(1),
                    to: account(2),
                    amount: 0,
                },
                Some(EventId::from_bytes([0xbb; 32])),
            ),
        ]
    }

    #[test]
    fn test_canonical_encoding_deterministic() {
        for record in sample_records() {
            assert_eq!(
                canonical_record_bytes(&record),
                canonical_record_bytes(&record)
            );
        }
    }

    #[test]
    fn test_record_roundtrip() {
        for record in sample_records() {
            let bytes = canonical_record_bytes(&record);
            let decoded = decode_record(&bytes).unwrap();
            assert_eq!(record, decoded);
        }
    }

    #[test]
    fn test_map_header_and_key_order() {
        let bytes = canonical_record_bytes(&sample_records()[0]);

        // 8-entry map header
        assert_eq!(bytes[0], 0xa8);
        // key 0 (version), value 0
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[2], 0x00);
        // key 1 (seq), value 1
        assert_eq!(bytes[3], 0x01);
        assert_eq!(bytes[4], 0x01);
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();

        // 0-23: single byte
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        // 24-255: two bytes
        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        // 256-65535: three bytes
        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        // Negative timestamp: -1 encodes as major type 1, value 0
        buf.clear();
        encode_i64(&mut buf, -1);
        assert_eq!(buf, vec![0x20]);
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let record = sample_records()[0].clone();
        let mut bytes = canonical_record_bytes(&record);

        // Layout: map header (1) + version pair (2) + seq pair (2) +
        // timestamp key (1) + 9-byte timestamp = kind key at 15, value at 16.
        assert_eq!(bytes[15], 0x03);
        bytes[16] = 0x09;

        assert!(matches!(
            decode_record(&bytes),
            Err(CodecError::UnknownKind(0x09))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_record(&[0xff, 0x00, 0x01]).is_err());
        assert!(decode_record(b"not cbor at all").is_err());
    }

    proptest! {
        #[test]
        fn prop_roundtrip_mint(seq in 1u64..=1_000_000, ts in 0i64..=1_800_000_000_000, amount in any::<u64>(), byte in 1u8..=255) {
            let record = EventRecord::new(
                seq,
                ts,
                LedgerEvent::Mint { account: account(byte), amount },
                if seq == 1 { None } else { Some(EventId::from_bytes([byte; 32])) },
            );
            let bytes = canonical_record_bytes(&record);
            let decoded = decode_record(&bytes).unwrap();
            prop_assert_eq!(record, decoded);
        }

        #[test]
        fn prop_distinct_amounts_distinct_ids(a in any::<u64>(), b in any::<u64>()) {
            prop_assume!(a != b);
            let ra = EventRecord::new(1, 0, LedgerEvent::Mint { account: account(1), amount: a }, None);
            let rb = EventRecord::new(1, 0, LedgerEvent::Mint { account: account(1), amount: b }, None);
            prop_assert_ne!(ra.compute_id(), rb.compute_id());
        }
    }
}
