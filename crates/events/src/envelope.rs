use serde::{Deserialize, Serialize};
use uuid::Uuid;

use supplychain_core::ProductId;

/// Envelope for a committed event, as handed to subscribers.
///
/// - `sequence_number` is the global, gap-free position in the ledger's log.
/// - `hash` is the chain link of the committed entry, so mirrors can
///   cross-check what they received against the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    product_id: ProductId,
    sequence_number: u64,
    hash: String,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        product_id: ProductId,
        sequence_number: u64,
        hash: impl Into<String>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            product_id,
            sequence_number,
            hash: hash.into(),
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
