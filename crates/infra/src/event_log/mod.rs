//! Append-only, hash-chained event log.
//!
//! The log is the audit trail: every product's current state can be rebuilt
//! from it alone. Backends differ only in where the entries live.

pub mod chain;
pub mod file;
pub mod in_memory;
mod index;
pub mod r#trait;

pub use chain::{GENESIS_HASH, verify_chain};
pub use file::FileEventLog;
pub use in_memory::InMemoryEventLog;
pub use r#trait::{EventLog, EventLogError, StoredEvent, UncommittedEvent};
