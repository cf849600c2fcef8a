//! Succession validation: a journal record must extend the head.
//!
//! The journal is a single append-only log. Record `n+1` must carry
//! `seq == n + 1` and chain to record `n` by content address. Used before
//! appending a new record and while replaying a persisted journal.

use crate::error::ValidationError;
use crate::event::EventRecord;
use crate::types::EventId;

/// Validate that `record` directly extends the journal head.
///
/// `head` is `None` for an empty journal (the record must then be the
/// genesis record: `seq == 1`, no prev), or `Some((head_seq, head_id))`.
pub fn validate_succession(
    head: Option<(u64, EventId)>,
    record: &EventRecord,
) -> Result<(), ValidationError> {
    let (expected_seq, expected_prev) = match head {
        Some((seq, id)) => (seq + 1, Some(id)),
        None => (1, None),
    };

    if record.seq != expected_seq {
        return Err(ValidationError::InvalidSequence {
            expected: expected_seq,
            got: record.seq,
        });
    }

    if record.prev_event_id != expected_prev {
        return Err(ValidationError::InvalidPrevEvent {
            expected: expected_prev,
            got: record.prev_event_id,
        });
    }

    Ok(())
}
