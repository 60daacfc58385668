use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use supplychain_core::{LedgerError, ProductId};
use supplychain_events::{Event, EventEnvelope};
use supplychain_products::LifecycleEvent;

/// An event ready to be appended (not yet assigned a position or hash).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub event_version: u32,
    pub event: LifecycleEvent,
}

impl UncommittedEvent {
    /// Wrap a domain event, capturing its metadata and a fresh time-ordered id.
    pub fn new(event: LifecycleEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            event_version: Event::version(&event),
            event,
        }
    }
}

/// An event committed to the log.
///
/// ## Sequence numbers
///
/// Global across all products, starting at 1, gap-free, never reused.
///
/// ## Hash chain
///
/// `prev_hash` is the `hash` of the entry at `sequence_number - 1` (or
/// [`GENESIS_HASH`](super::GENESIS_HASH) for the first entry). Editing,
/// dropping or reordering any entry breaks every link after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub sequence_number: u64,
    pub event_type: String,
    pub event_version: u32,
    pub prev_hash: String,
    pub hash: String,
    pub event: LifecycleEvent,
}

impl StoredEvent {
    pub fn product_id(&self) -> ProductId {
        self.event.product_id
    }

    /// Envelope handed to bus subscribers.
    pub fn to_envelope(&self) -> EventEnvelope<LifecycleEvent> {
        EventEnvelope::new(
            self.event_id,
            self.event.product_id,
            self.sequence_number,
            self.hash.clone(),
            self.event.clone(),
        )
    }
}

/// Event log operation error. Every variant is a storage fault from the
/// ledger's point of view.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("event log corrupt at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("hash chain broken at sequence {sequence}")]
    ChainBroken { sequence: u64 },

    #[error("sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("event log lock poisoned")]
    Poisoned,

    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

impl From<EventLogError> for LedgerError {
    fn from(value: EventLogError) -> Self {
        LedgerError::StorageFault(value.to_string())
    }
}

/// Append-only event log.
///
/// Implementations must:
/// - assign sequence numbers `last + 1` and chain hashes on append
/// - make an append all-or-nothing (a failed append leaves no entry)
/// - return per-product events in append order
/// - never edit, drop or reorder committed entries
pub trait EventLog: Send + Sync {
    fn append(&self, event: UncommittedEvent) -> Result<StoredEvent, EventLogError>;

    /// All events of one product, oldest first.
    fn list_events(&self, product_id: ProductId) -> Result<Vec<StoredEvent>, EventLogError>;

    /// The whole log, oldest first.
    fn read_all(&self) -> Result<Vec<StoredEvent>, EventLogError>;

    /// Number of committed entries.
    fn len(&self) -> Result<u64, EventLogError>;

    fn is_empty(&self) -> Result<bool, EventLogError> {
        Ok(self.len()? == 0)
    }
}

impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    fn append(&self, event: UncommittedEvent) -> Result<StoredEvent, EventLogError> {
        (**self).append(event)
    }

    fn list_events(&self, product_id: ProductId) -> Result<Vec<StoredEvent>, EventLogError> {
        (**self).list_events(product_id)
    }

    fn read_all(&self) -> Result<Vec<StoredEvent>, EventLogError> {
        (**self).read_all()
    }

    fn len(&self) -> Result<u64, EventLogError> {
        (**self).len()
    }
}
