use std::collections::HashMap;

use supplychain_core::ProductId;

use super::chain::{GENESIS_HASH, seal};
use super::r#trait::{EventLogError, StoredEvent, UncommittedEvent};

/// In-memory view of a log: entries in order plus a per-product index.
#[derive(Debug, Default)]
pub(super) struct LogIndex {
    events: Vec<StoredEvent>,
    by_product: HashMap<ProductId, Vec<usize>>,
}

impl LogIndex {
    /// Seal `entry` as the next link without recording it.
    pub(super) fn seal_next(&self, entry: UncommittedEvent) -> Result<StoredEvent, EventLogError> {
        let prev_hash = self.events.last().map(|e| e.hash.as_str()).unwrap_or(GENESIS_HASH);
        seal(prev_hash, self.events.len() as u64 + 1, entry)
    }

    /// Record an already-sealed entry.
    pub(super) fn push(&mut self, stored: StoredEvent) {
        let position = self.events.len();
        self.by_product.entry(stored.product_id()).or_default().push(position);
        self.events.push(stored);
    }

    pub(super) fn product_events(&self, product_id: ProductId) -> Vec<StoredEvent> {
        self.by_product
            .get(&product_id)
            .map(|positions| positions.iter().map(|&p| self.events[p].clone()).collect())
            .unwrap_or_default()
    }

    pub(super) fn all(&self) -> Vec<StoredEvent> {
        self.events.clone()
    }

    pub(super) fn len(&self) -> u64 {
        self.events.len() as u64
    }
}
