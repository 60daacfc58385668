//! `supplychain-core`: ledger foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the fixed lifecycle, the error taxonomy and the aggregate traits.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod state;

pub use aggregate::{Aggregate, AggregateRoot};
pub use error::{LedgerError, LedgerResult};
pub use id::{ActorId, ProductId};
pub use state::LifecycleState;
