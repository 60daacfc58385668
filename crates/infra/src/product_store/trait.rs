use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use supplychain_core::{ActorId, LedgerError, LifecycleState, ProductId};
use supplychain_products::ProductRecord;

/// Product store operation error.
///
/// `NotFound` is a caller error; everything else is a storage-layer fault.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("product store lock poisoned")]
    Poisoned,

    #[error("product store rollback rejected: {0}")]
    Rollback(String),

    #[error("product store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => LedgerError::NotFound(id),
            other => LedgerError::StorageFault(other.to_string()),
        }
    }
}

/// Durable table of product records.
///
/// ## Id assignment
///
/// `insert` allocates ids `0, 1, 2, ...` with no gaps. `count()` is the
/// exclusive upper bound for enumeration.
///
/// ## Mutation
///
/// `update` and `revert` rewrite `state`/`owner` in place. `rollback_insert`
/// may only discard the most recently inserted record. The last two exist so
/// the ledger engine can compensate a mutation whose event failed to commit.
pub trait ProductStore: Send + Sync {
    /// Store a new record in state `Created`, owned by `creator`.
    fn insert(&self, name: &str, creator: &ActorId, now: DateTime<Utc>) -> Result<ProductId, StoreError>;

    fn get(&self, id: ProductId) -> Result<ProductRecord, StoreError>;

    /// Number of records ever inserted (and not rolled back).
    fn count(&self) -> Result<u64, StoreError>;

    /// Move a record to `state`, handing custody to `owner`. Returns the updated record.
    fn update(&self, id: ProductId, state: LifecycleState, owner: &ActorId) -> Result<ProductRecord, StoreError>;

    /// Undo the last `update` of `id`, restoring the given state and owner.
    fn revert(&self, id: ProductId, state: LifecycleState, owner: &ActorId) -> Result<(), StoreError>;

    /// Discard the record created by the most recent `insert`.
    fn rollback_insert(&self, id: ProductId) -> Result<(), StoreError>;
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn insert(&self, name: &str, creator: &ActorId, now: DateTime<Utc>) -> Result<ProductId, StoreError> {
        (**self).insert(name, creator, now)
    }

    fn get(&self, id: ProductId) -> Result<ProductRecord, StoreError> {
        (**self).get(id)
    }

    fn count(&self) -> Result<u64, StoreError> {
        (**self).count()
    }

    fn update(&self, id: ProductId, state: LifecycleState, owner: &ActorId) -> Result<ProductRecord, StoreError> {
        (**self).update(id, state, owner)
    }

    fn revert(&self, id: ProductId, state: LifecycleState, owner: &ActorId) -> Result<(), StoreError> {
        (**self).revert(id, state, owner)
    }

    fn rollback_insert(&self, id: ProductId) -> Result<(), StoreError> {
        (**self).rollback_insert(id)
    }
}
