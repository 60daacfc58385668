use std::sync::RwLock;

use chrono::{DateTime, Utc};

use supplychain_core::{ActorId, LifecycleState, ProductId};
use supplychain_products::ProductRecord;

use super::r#trait::{ProductStore, StoreError};

/// In-memory product table, indexed densely by id.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    records: RwLock<Vec<ProductRecord>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for InMemoryProductStore {
    fn insert(&self, name: &str, creator: &ActorId, now: DateTime<Utc>) -> Result<ProductId, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let id = ProductId::new(records.len() as u64);
        records.push(ProductRecord::new(id, name, creator.clone(), now));
        Ok(id)
    }

    fn get(&self, id: ProductId) -> Result<ProductRecord, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        records.get(id.index()).cloned().ok_or(StoreError::NotFound(id))
    }

    fn count(&self) -> Result<u64, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.len() as u64)
    }

    fn update(&self, id: ProductId, state: LifecycleState, owner: &ActorId) -> Result<ProductRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let record = records.get_mut(id.index()).ok_or(StoreError::NotFound(id))?;
        record.transition_to(state, owner.clone());
        Ok(record.clone())
    }

    fn revert(&self, id: ProductId, state: LifecycleState, owner: &ActorId) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let record = records.get_mut(id.index()).ok_or(StoreError::NotFound(id))?;
        record.revert_to(state, owner.clone());
        Ok(())
    }

    fn rollback_insert(&self, id: ProductId) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        match records.last() {
            Some(last) if last.product_id() == id => {
                records.pop();
                Ok(())
            }
            Some(last) => Err(StoreError::Rollback(format!(
                "product {id} is not the latest insert (latest is {})",
                last.product_id()
            ))),
            None => Err(StoreError::Rollback(format!("store is empty, cannot discard {id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use supplychain_core::AggregateRoot;

    fn actor(name: &str) -> ActorId {
        ActorId::new(name).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn insert_assigns_sequential_ids_from_zero() {
        let store = InMemoryProductStore::new();
        let ids: Vec<_> = (0..3)
            .map(|i| store.insert(&format!("p{i}"), &actor("alice"), now()).unwrap())
            .collect();
        assert_eq!(ids, vec![ProductId::new(0), ProductId::new(1), ProductId::new(2)]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn inserted_record_is_created_and_owned_by_creator() {
        let store = InMemoryProductStore::new();
        let id = store.insert("Widget", &actor("alice"), now()).unwrap();
        let record = store.get(id).unwrap();
        assert_eq!(record.state(), LifecycleState::Created);
        assert_eq!(record.owner(), &actor("alice"));
        assert_eq!(record.created_at(), now());
    }

    #[test]
    fn get_beyond_count_is_not_found() {
        let store = InMemoryProductStore::new();
        store.insert("Widget", &actor("alice"), now()).unwrap();
        assert_eq!(store.get(ProductId::new(1)), Err(StoreError::NotFound(ProductId::new(1))));
    }

    #[test]
    fn update_then_revert_restores_record() {
        let store = InMemoryProductStore::new();
        let id = store.insert("Widget", &actor("alice"), now()).unwrap();
        let before = store.get(id).unwrap();

        let updated = store.update(id, LifecycleState::Packed, &actor("bob")).unwrap();
        assert_eq!(updated.state(), LifecycleState::Packed);
        assert_eq!(updated.owner(), &actor("bob"));
        assert_eq!(updated.version(), 2);

        store.revert(id, LifecycleState::Created, &actor("alice")).unwrap();
        assert_eq!(store.get(id).unwrap(), before);
    }

    #[test]
    fn rollback_only_discards_latest_insert() {
        let store = InMemoryProductStore::new();
        let first = store.insert("a", &actor("alice"), now()).unwrap();
        let second = store.insert("b", &actor("alice"), now()).unwrap();

        assert!(matches!(store.rollback_insert(first), Err(StoreError::Rollback(_))));
        store.rollback_insert(second).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        // The discarded id is handed out again.
        assert_eq!(store.insert("c", &actor("alice"), now()).unwrap(), second);
    }
}
