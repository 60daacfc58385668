//! Product Store: keyed storage of product records with sequential ids.
//!
//! The store is a dumb table. It never validates transitions; the ledger
//! engine is its only writer and calls it strictly after validation.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryProductStore;
pub use r#trait::{ProductStore, StoreError};
