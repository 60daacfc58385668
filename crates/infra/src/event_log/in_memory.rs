use std::sync::RwLock;

use supplychain_core::ProductId;

use super::index::LogIndex;
use super::r#trait::{EventLog, EventLogError, StoredEvent, UncommittedEvent};

/// In-memory append-only event log.
///
/// Intended for tests/dev. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    index: RwLock<LogIndex>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventLog for InMemoryEventLog {
    fn append(&self, event: UncommittedEvent) -> Result<StoredEvent, EventLogError> {
        let mut index = self.index.write().map_err(|_| EventLogError::Poisoned)?;
        let stored = index.seal_next(event)?;
        index.push(stored.clone());
        Ok(stored)
    }

    fn list_events(&self, product_id: ProductId) -> Result<Vec<StoredEvent>, EventLogError> {
        let index = self.index.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(index.product_events(product_id))
    }

    fn read_all(&self) -> Result<Vec<StoredEvent>, EventLogError> {
        let index = self.index.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(index.all())
    }

    fn len(&self) -> Result<u64, EventLogError> {
        let index = self.index.read().map_err(|_| EventLogError::Poisoned)?;
        Ok(index.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use supplychain_core::{ActorId, LifecycleState};
    use supplychain_products::LifecycleEvent;

    use crate::event_log::verify_chain;

    fn created(id: u64) -> UncommittedEvent {
        UncommittedEvent::new(LifecycleEvent::created(
            ProductId::new(id),
            "Widget",
            ActorId::new("alice").unwrap(),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        ))
    }

    fn packed(id: u64) -> UncommittedEvent {
        UncommittedEvent::new(LifecycleEvent {
            product_id: ProductId::new(id),
            previous_state: Some(LifecycleState::Created),
            new_state: LifecycleState::Packed,
            actor: ActorId::new("bob").unwrap(),
            name: None,
            occurred_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
        })
    }

    #[test]
    fn append_assigns_global_sequence_from_one() {
        let log = InMemoryEventLog::new();
        assert!(log.is_empty().unwrap());
        let a = log.append(created(0)).unwrap();
        let b = log.append(created(1)).unwrap();
        let c = log.append(packed(0)).unwrap();
        assert_eq!((a.sequence_number, b.sequence_number, c.sequence_number), (1, 2, 3));
        assert_eq!(log.len().unwrap(), 3);
        verify_chain(&log.read_all().unwrap()).unwrap();
    }

    #[test]
    fn list_events_filters_by_product_in_order() {
        let log = InMemoryEventLog::new();
        log.append(created(0)).unwrap();
        log.append(created(1)).unwrap();
        log.append(packed(0)).unwrap();

        let events = log.list_events(ProductId::new(0)).unwrap();
        let seqs: Vec<_> = events.iter().map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![1, 3]);
        assert!(log.list_events(ProductId::new(7)).unwrap().is_empty());
    }

    #[test]
    fn envelope_mirrors_stored_metadata() {
        let log = InMemoryEventLog::new();
        let stored = log.append(created(0)).unwrap();
        let envelope = stored.to_envelope();
        assert_eq!(envelope.sequence_number(), 1);
        assert_eq!(envelope.hash(), stored.hash);
        assert_eq!(envelope.product_id(), ProductId::new(0));
        assert_eq!(envelope.payload(), &stored.event);
    }
}
