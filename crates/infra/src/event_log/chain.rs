//! Hash chaining of log entries.

use sha2::{Digest, Sha256};

use super::r#trait::{EventLogError, StoredEvent, UncommittedEvent};

/// `prev_hash` of the first entry.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// SHA-256 over `prev_hash:sequence:event_id:event_type:compact-json(event)`, hex encoded.
pub fn link_hash(prev_hash: &str, sequence_number: u64, entry: &UncommittedEvent) -> Result<String, EventLogError> {
    let canonical = serde_json::to_string(&entry.event)?;
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(b":");
    hasher.update(sequence_number.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(entry.event_id.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(entry.event_type.as_bytes());
    hasher.update(b":");
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Assign `sequence_number` and chain `entry` onto `prev_hash`.
pub fn seal(prev_hash: &str, sequence_number: u64, entry: UncommittedEvent) -> Result<StoredEvent, EventLogError> {
    let hash = link_hash(prev_hash, sequence_number, &entry)?;
    Ok(StoredEvent {
        event_id: entry.event_id,
        sequence_number,
        event_type: entry.event_type,
        event_version: entry.event_version,
        prev_hash: prev_hash.to_string(),
        hash,
        event: entry.event,
    })
}

/// Recompute every link of a full log, reporting the first gap or break.
pub fn verify_chain(events: &[StoredEvent]) -> Result<(), EventLogError> {
    let mut prev_hash = GENESIS_HASH.to_string();
    for (idx, stored) in events.iter().enumerate() {
        let expected = idx as u64 + 1;
        if stored.sequence_number != expected {
            return Err(EventLogError::SequenceGap {
                expected,
                found: stored.sequence_number,
            });
        }
        if stored.prev_hash != prev_hash {
            return Err(EventLogError::ChainBroken { sequence: expected });
        }
        let entry = UncommittedEvent {
            event_id: stored.event_id,
            event_type: stored.event_type.clone(),
            event_version: stored.event_version,
            event: stored.event.clone(),
        };
        if link_hash(&prev_hash, expected, &entry)? != stored.hash {
            return Err(EventLogError::ChainBroken { sequence: expected });
        }
        prev_hash = stored.hash.clone();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use supplychain_core::{ActorId, LifecycleState, ProductId};
    use supplychain_products::LifecycleEvent;

    fn chain_of(n: u64) -> Vec<StoredEvent> {
        let actor = ActorId::new("alice").unwrap();
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut prev = GENESIS_HASH.to_string();
        let mut out = Vec::new();
        for seq in 1..=n {
            let event = LifecycleEvent::created(ProductId::new(seq - 1), format!("p{seq}"), actor.clone(), at);
            let stored = seal(&prev, seq, UncommittedEvent::new(event)).unwrap();
            prev = stored.hash.clone();
            out.push(stored);
        }
        out
    }

    #[test]
    fn sealed_chain_verifies() {
        let chain = chain_of(4);
        assert_eq!(chain[0].prev_hash, GENESIS_HASH);
        assert_eq!(chain[1].prev_hash, chain[0].hash);
        assert_eq!(chain[0].hash.len(), 64);
        verify_chain(&chain).unwrap();
        verify_chain(&[]).unwrap();
    }

    #[test]
    fn tampered_payload_breaks_chain() {
        let mut chain = chain_of(3);
        chain[1].event.new_state = LifecycleState::Delivered;
        match verify_chain(&chain) {
            Err(EventLogError::ChainBroken { sequence: 2 }) => {}
            other => panic!("expected ChainBroken at 2, got {other:?}"),
        }
    }

    #[test]
    fn dropped_entry_is_a_gap() {
        let mut chain = chain_of(3);
        chain.remove(1);
        match verify_chain(&chain) {
            Err(EventLogError::SequenceGap { expected: 2, found: 3 }) => {}
            other => panic!("expected SequenceGap, got {other:?}"),
        }
    }

    #[test]
    fn rewritten_link_is_detected() {
        let mut chain = chain_of(2);
        chain[1].prev_hash = GENESIS_HASH.to_string();
        assert!(matches!(verify_chain(&chain), Err(EventLogError::ChainBroken { sequence: 2 })));
    }
}
