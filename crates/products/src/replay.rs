//! Rebuild a product record from its events alone.
//!
//! Replay is strict: the first event must be the creation event and every
//! later event must start where the previous one ended and take exactly one
//! legal step. Anything else means the history is not trustworthy.

use thiserror::Error;

use supplychain_core::{Aggregate, LifecycleState, ProductId};

use crate::product::{LifecycleEvent, ProductRecord};
use crate::transition::can_transition;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("product {0} has no events")]
    Empty(ProductId),

    #[error("product {id}: first event is not a creation event")]
    MissingCreation { id: ProductId },

    #[error("product {id}: event {index} belongs to product {found}")]
    ForeignEvent {
        id: ProductId,
        index: usize,
        found: ProductId,
    },

    #[error("product {id}: event {index} starts from {found:?}, expected {expected}")]
    Discontinuity {
        id: ProductId,
        index: usize,
        expected: LifecycleState,
        found: Option<LifecycleState>,
    },

    #[error("product {id}: event {index} moves {from} -> {to}")]
    IllegalStep {
        id: ProductId,
        index: usize,
        from: LifecycleState,
        to: LifecycleState,
    },
}

/// Replay `events` (in log order) into the record they describe.
pub fn replay(id: ProductId, events: &[LifecycleEvent]) -> Result<ProductRecord, ReplayError> {
    let (first, rest) = events.split_first().ok_or(ReplayError::Empty(id))?;
    if first.product_id != id {
        return Err(ReplayError::ForeignEvent {
            id,
            index: 0,
            found: first.product_id,
        });
    }
    let mut record = ProductRecord::from_created(first).ok_or(ReplayError::MissingCreation { id })?;

    for (offset, event) in rest.iter().enumerate() {
        let index = offset + 1;
        if event.product_id != id {
            return Err(ReplayError::ForeignEvent {
                id,
                index,
                found: event.product_id,
            });
        }
        let current = record.state();
        if event.previous_state != Some(current) {
            return Err(ReplayError::Discontinuity {
                id,
                index,
                expected: current,
                found: event.previous_state,
            });
        }
        if !can_transition(current, event.new_state) {
            return Err(ReplayError::IllegalStep {
                id,
                index,
                from: current,
                to: event.new_state,
            });
        }
        record.apply(event);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;
    use supplychain_core::{ActorId, AggregateRoot};

    use crate::product::ChangeState;

    fn actor(name: &str) -> ActorId {
        ActorId::new(name).unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn step(id: ProductId, from: LifecycleState, to: LifecycleState, who: &str) -> LifecycleEvent {
        LifecycleEvent {
            product_id: id,
            previous_state: Some(from),
            new_state: to,
            actor: actor(who),
            name: None,
            occurred_at: t(to.code() as i64),
        }
    }

    #[test]
    fn replays_full_lifecycle() {
        let id = ProductId::new(2);
        let events = vec![
            LifecycleEvent::created(id, "Widget", actor("alice"), t(0)),
            step(id, LifecycleState::Created, LifecycleState::Packed, "packer"),
            step(id, LifecycleState::Packed, LifecycleState::Shipped, "carrier"),
            step(id, LifecycleState::Shipped, LifecycleState::Delivered, "bob"),
        ];
        let record = replay(id, &events).unwrap();
        assert_eq!(record.state(), LifecycleState::Delivered);
        assert_eq!(record.owner(), &actor("bob"));
        assert_eq!(record.name(), "Widget");
        assert_eq!(record.version(), 4);
    }

    #[test]
    fn rejects_empty_history() {
        assert_eq!(replay(ProductId::FIRST, &[]), Err(ReplayError::Empty(ProductId::FIRST)));
    }

    #[test]
    fn rejects_history_without_creation() {
        let id = ProductId::FIRST;
        let events = vec![step(id, LifecycleState::Created, LifecycleState::Packed, "a")];
        assert_eq!(replay(id, &events), Err(ReplayError::MissingCreation { id }));
    }

    #[test]
    fn rejects_skipped_state() {
        let id = ProductId::FIRST;
        let events = vec![
            LifecycleEvent::created(id, "Widget", actor("alice"), t(0)),
            step(id, LifecycleState::Created, LifecycleState::Shipped, "alice"),
        ];
        match replay(id, &events) {
            Err(ReplayError::IllegalStep { index: 1, .. }) => {}
            other => panic!("expected IllegalStep, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicated_step() {
        let id = ProductId::FIRST;
        let events = vec![
            LifecycleEvent::created(id, "Widget", actor("alice"), t(0)),
            step(id, LifecycleState::Created, LifecycleState::Packed, "alice"),
            step(id, LifecycleState::Created, LifecycleState::Packed, "alice"),
        ];
        match replay(id, &events) {
            Err(ReplayError::Discontinuity { index: 2, expected: LifecycleState::Packed, .. }) => {}
            other => panic!("expected Discontinuity, got {other:?}"),
        }
    }

    #[test]
    fn rejects_foreign_events() {
        let id = ProductId::FIRST;
        let other = ProductId::new(1);
        let events = vec![
            LifecycleEvent::created(id, "Widget", actor("alice"), t(0)),
            step(other, LifecycleState::Created, LifecycleState::Packed, "alice"),
        ];
        match replay(id, &events) {
            Err(ReplayError::ForeignEvent { index: 1, found, .. }) => assert_eq!(found, other),
            other => panic!("expected ForeignEvent, got {other:?}"),
        }
    }

    proptest! {
        /// Property: driving a record with arbitrary requests keeps state
        /// monotonic, and replaying the accepted events reproduces the record.
        #[test]
        fn replay_matches_live_record(
            requests in proptest::collection::vec((0u8..6, "[a-z]{1,8}"), 0..24)
        ) {
            let id = ProductId::new(5);
            let creation = LifecycleEvent::created(id, "Crate", actor("maker"), t(0));
            let mut record = ProductRecord::from_created(&creation).unwrap();
            let mut events = vec![creation];

            for (i, (requested, who)) in requests.into_iter().enumerate() {
                let before = record.state();
                let cmd = ChangeState {
                    product_id: id,
                    requested,
                    actor: actor(&who),
                    occurred_at: t(i as i64 + 1),
                };
                match record.handle(&cmd) {
                    Ok(decided) => {
                        for event in decided {
                            record.apply(&event);
                            events.push(event);
                        }
                        prop_assert_eq!(record.state().code(), before.code() + 1);
                    }
                    Err(_) => prop_assert_eq!(record.state(), before),
                }
            }

            let rebuilt = replay(id, &events).unwrap();
            prop_assert_eq!(&rebuilt, &record);
            prop_assert_eq!(rebuilt.version(), events.len() as u64);
            prop_assert_eq!(rebuilt.owner(), &events.last().unwrap().actor);
        }
    }
}
