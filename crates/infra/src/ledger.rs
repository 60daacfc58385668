//! Ledger Engine: the single point of mutation.
//!
//! ## Command execution flow
//!
//! ```text
//! change_state(id, requested, actor)
//!   ↓
//! 1. Take the product's lock (NotFound if the id was never committed)
//!   ↓
//! 2. Load the current record from the Product Store
//!   ↓
//! 3. Decide (pure): terminal → InvalidState, not the successor → IllegalTransition
//!   ↓
//! 4. Take the commit lock
//!   ↓
//! 5. Mutate the Product Store
//!   ↓
//! 6. Append the event to the Event Log (on failure: undo step 5)
//!   ↓
//! 7. Publish the committed event to subscribers
//! ```
//!
//! Creation runs steps 4-7 too, so ids come out dense and strictly
//! increasing.
//!
//! ## Consistency
//!
//! A product's lock is held across store mutation and log append, and every
//! read of a single product takes the same lock. Readers therefore never see a
//! record whose state disagrees with the last event in its history.
//!
//! The commit lock is held from append through publish, so subscribers
//! receive envelopes in log order and a product's creation always reaches
//! them before any of its transitions.

use std::sync::{Mutex, MutexGuard};

use tracing::{error, info, warn};

use supplychain_core::{
    ActorId, Aggregate, LedgerError, LedgerResult, LifecycleState, ProductId,
};
use supplychain_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use supplychain_products::{
    ChangeState, LifecycleEvent, ProductRecord, ProductView, can_transition,
};

use crate::clock::{Clock, SystemClock};
use crate::event_log::{EventLog, StoredEvent, UncommittedEvent, verify_chain};
use crate::locks::ProductLocks;
use crate::product_store::ProductStore;

/// Committed-event envelope as seen by subscribers.
pub type LedgerEnvelope = EventEnvelope<LifecycleEvent>;

/// The product lifecycle ledger.
///
/// Owns one Product Store and one Event Log. Callers share a ledger by
/// reference (or behind an `Arc`); there is no global instance.
#[derive(Debug)]
pub struct Ledger<S, L, C = SystemClock> {
    store: S,
    log: L,
    clock: C,
    locks: ProductLocks,
    commit_lock: Mutex<()>,
    bus: InMemoryEventBus<LedgerEnvelope>,
}

impl<S, L> Ledger<S, L, SystemClock>
where
    S: ProductStore,
    L: EventLog,
{
    /// A ledger over an empty store and an empty log.
    pub fn new(store: S, log: L) -> Self {
        Self::with_clock(store, log, SystemClock)
    }

    /// Rebuild a ledger from an existing log; see [`Ledger::recover_with_clock`].
    pub fn recover(store: S, log: L) -> LedgerResult<Self> {
        Self::recover_with_clock(store, log, SystemClock)
    }
}

impl<S, L, C> Ledger<S, L, C>
where
    S: ProductStore,
    L: EventLog,
    C: Clock,
{
    pub fn with_clock(store: S, log: L, clock: C) -> Self {
        Self {
            store,
            log,
            clock,
            locks: ProductLocks::new(),
            commit_lock: Mutex::new(()),
            bus: InMemoryEventBus::new(),
        }
    }

    /// Rebuild the Product Store from the Event Log.
    ///
    /// `store` must be empty. The log's hash chain is verified and every event
    /// is checked to be a legal step for its product before it is applied.
    pub fn recover_with_clock(store: S, log: L, clock: C) -> LedgerResult<Self> {
        if store.count()? != 0 {
            return Err(LedgerError::storage("recovery requires an empty product store"));
        }

        let events = log.read_all()?;
        verify_chain(&events)?;

        let ledger = Self::with_clock(store, log, clock);
        let mut states: Vec<LifecycleState> = Vec::new();

        for stored in &events {
            let event = &stored.event;
            let id = event.product_id;

            if event.is_creation() {
                let expected = ProductId::new(states.len() as u64);
                let name = event.name.as_deref().unwrap_or_default();
                if id != expected || ProductRecord::validate_name(name).is_err() {
                    return Err(LedgerError::storage(format!(
                        "log entry {} creates product {id} out of order or without a name",
                        stored.sequence_number
                    )));
                }
                if event.new_state != LifecycleState::INITIAL {
                    return Err(LedgerError::storage(format!(
                        "log entry {} creates product {id} in state {} instead of {}",
                        stored.sequence_number,
                        event.new_state,
                        LifecycleState::INITIAL
                    )));
                }
                let inserted = ledger.store.insert(name, &event.actor, event.occurred_at)?;
                if inserted != id {
                    return Err(LedgerError::storage(format!(
                        "store assigned {inserted} while replaying product {id}"
                    )));
                }
                ledger.locks.register(id)?;
                states.push(event.new_state);
                continue;
            }

            let current = states.get_mut(id.index()).ok_or_else(|| {
                LedgerError::storage(format!(
                    "log entry {} references unknown product {id}",
                    stored.sequence_number
                ))
            })?;
            if event.previous_state != Some(*current) || !can_transition(*current, event.new_state) {
                return Err(LedgerError::storage(format!(
                    "log entry {} moves product {id} from {:?} to {} while it is {}",
                    stored.sequence_number, event.previous_state, event.new_state, current
                )));
            }
            ledger.store.update(id, event.new_state, &event.actor)?;
            *current = event.new_state;
        }

        info!(products = states.len(), events = events.len(), "ledger recovered from event log");
        Ok(ledger)
    }

    /// Create a product owned by `creator`. Ids start at 0 and have no gaps.
    ///
    /// Side effects: one new record, one creation event.
    pub fn create_product(&self, name: &str, creator: &ActorId) -> LedgerResult<ProductId> {
        ProductRecord::validate_name(name)?;

        let _commit = lock(&self.commit_lock, "commit lock")?;

        let now = self.clock.now();
        let expected = ProductId::new(self.locks.len());
        let id = self.store.insert(name, creator, now)?;
        if id != expected {
            error!(product_id = %id, expected = %expected, "product store assigned an unexpected id");
            self.discard_insert(id)?;
            return Err(LedgerError::storage(format!(
                "product store assigned id {id}, expected {expected}"
            )));
        }

        let event = LifecycleEvent::created(id, name, creator.clone(), now);
        let stored = match self.log.append(UncommittedEvent::new(event)) {
            Ok(stored) => stored,
            Err(err) => {
                error!(product_id = %id, error = %err, "creation event failed to commit");
                self.discard_insert(id)?;
                return Err(err.into());
            }
        };

        self.locks.register(id)?;
        info!(product_id = %id, actor = %creator, sequence = stored.sequence_number, "product created");
        self.publish(&stored);
        Ok(id)
    }

    /// Move product `id` to `requested` (wire code of the next state),
    /// crediting `actor` and handing it custody.
    ///
    /// Checks run in this order: unknown id → `NotFound`; product already
    /// Delivered → `InvalidState`; `requested` not the successor →
    /// `IllegalTransition`.
    pub fn change_state(&self, id: ProductId, requested: u8, actor: &ActorId) -> LedgerResult<ProductRecord> {
        self.transition(id, actor, |_| requested)
    }

    /// Move product `id` to the state after its current one.
    pub fn advance(&self, id: ProductId, actor: &ActorId) -> LedgerResult<ProductRecord> {
        self.transition(id, actor, |record| {
            let state = record.state();
            // A terminal record is rejected by `handle` regardless of the code.
            state.successor().unwrap_or(state).code()
        })
    }

    fn transition(
        &self,
        id: ProductId,
        actor: &ActorId,
        requested: impl FnOnce(&ProductRecord) -> u8,
    ) -> LedgerResult<ProductRecord> {
        let slot = self.locks.slot(id)?;
        let _guard = lock(&slot, "product lock")?;

        let record = self.store.get(id)?;
        let cmd = ChangeState {
            product_id: id,
            requested: requested(&record),
            actor: actor.clone(),
            occurred_at: self.clock.now(),
        };

        let decided = match record.handle(&cmd) {
            Ok(decided) => decided,
            Err(err) => {
                warn!(product_id = %id, actor = %actor, from = %record.state(), requested = cmd.requested, error = %err, "transition rejected");
                return Err(err);
            }
        };
        let Some(event) = decided.into_iter().next() else {
            return Ok(record);
        };

        let _commit = lock(&self.commit_lock, "commit lock")?;
        let updated = self.store.update(id, event.new_state, &event.actor)?;

        let stored = match self.log.append(UncommittedEvent::new(event)) {
            Ok(stored) => stored,
            Err(err) => {
                error!(product_id = %id, error = %err, "transition event failed to commit; reverting store");
                if let Err(revert_err) = self.store.revert(id, record.state(), record.owner()) {
                    error!(product_id = %id, error = %revert_err, "store revert failed");
                    return Err(LedgerError::storage(format!(
                        "{err}; store revert also failed: {revert_err}"
                    )));
                }
                return Err(err.into());
            }
        };

        info!(
            product_id = %id,
            actor = %actor,
            from = %record.state(),
            to = %updated.state(),
            sequence = stored.sequence_number,
            "product state changed"
        );
        self.publish(&stored);
        Ok(updated)
    }

    fn discard_insert(&self, id: ProductId) -> LedgerResult<()> {
        self.store.rollback_insert(id).map_err(|err| {
            error!(product_id = %id, error = %err, "store rollback failed");
            LedgerError::storage(format!("rollback of product {id} failed: {err}"))
        })
    }

    fn publish(&self, stored: &StoredEvent) {
        if let Err(err) = self.bus.publish(stored.to_envelope()) {
            warn!(sequence = stored.sequence_number, error = ?err, "failed to publish committed event");
        }
    }

    /// The record of product `id`.
    pub fn get(&self, id: ProductId) -> LedgerResult<ProductRecord> {
        let slot = self.locks.slot(id)?;
        let _guard = lock(&slot, "product lock")?;
        Ok(self.store.get(id)?)
    }

    /// Number of products created; the exclusive upper bound for `get`.
    pub fn count(&self) -> u64 {
        self.locks.len()
    }

    /// Records `0 .. count()`, in id order.
    pub fn list_products(&self) -> LedgerResult<Vec<ProductRecord>> {
        (0..self.count()).map(|i| self.get(ProductId::new(i))).collect()
    }

    /// Audit trail of product `id`, oldest first.
    pub fn list_events(&self, id: ProductId) -> LedgerResult<Vec<StoredEvent>> {
        let slot = self.locks.slot(id)?;
        let _guard = lock(&slot, "product lock")?;
        Ok(self.log.list_events(id)?)
    }

    /// Record and events of product `id`, read under one lock.
    pub fn history(&self, id: ProductId) -> LedgerResult<(ProductRecord, Vec<StoredEvent>)> {
        let slot = self.locks.slot(id)?;
        let _guard = lock(&slot, "product lock")?;
        Ok((self.store.get(id)?, self.log.list_events(id)?))
    }

    pub fn view(&self, id: ProductId) -> LedgerResult<ProductView> {
        self.get(id).map(|record| ProductView::from(&record))
    }

    pub fn list_views(&self) -> LedgerResult<Vec<ProductView>> {
        Ok(self.list_products()?.iter().map(ProductView::from).collect())
    }

    /// Receive every event committed from now on.
    pub fn subscribe(&self) -> Subscription<LedgerEnvelope> {
        self.bus.subscribe()
    }

    pub fn event_log(&self) -> &L {
        &self.log
    }

    pub fn product_store(&self) -> &S {
        &self.store
    }
}

fn lock<'a>(mutex: &'a Mutex<()>, what: &str) -> LedgerResult<MutexGuard<'a, ()>> {
    mutex
        .lock()
        .map_err(|_| LedgerError::storage(format!("{what} poisoned by a failed operation")))
}
