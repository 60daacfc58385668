//! Per-product mutual exclusion.
//!
//! One mutex per committed product, indexed by id. The table only grows, and
//! its length is the number of products whose creation fully committed.

use std::sync::{Arc, Mutex, RwLock};

use supplychain_core::{LedgerError, LedgerResult, ProductId};

#[derive(Debug, Default)]
pub struct ProductLocks {
    slots: RwLock<Vec<Arc<Mutex<()>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered products.
    pub fn len(&self) -> u64 {
        self.slots.read().map(|slots| slots.len() as u64).unwrap_or_else(|p| p.into_inner().len() as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register the lock for a just-committed product. Ids must arrive in
    /// order with no gaps.
    pub fn register(&self, id: ProductId) -> LedgerResult<()> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| LedgerError::storage("product lock table poisoned"))?;
        if id.index() != slots.len() {
            return Err(LedgerError::storage(format!(
                "lock registration out of order: expected id {}, got {id}",
                slots.len()
            )));
        }
        slots.push(Arc::new(Mutex::new(())));
        Ok(())
    }

    /// The mutex guarding `id`, or `NotFound` if the product is not committed.
    pub fn slot(&self, id: ProductId) -> LedgerResult<Arc<Mutex<()>>> {
        let slots = self
            .slots
            .read()
            .map_err(|_| LedgerError::storage("product lock table poisoned"))?;
        slots.get(id.index()).cloned().ok_or(LedgerError::NotFound(id))
    }
}
