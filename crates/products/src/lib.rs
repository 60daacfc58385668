//! Product lifecycle domain module (event-sourced).
//!
//! Business rules for tracked products, implemented purely as deterministic
//! domain logic (no IO, no locking, no storage).

pub mod product;
pub mod replay;
pub mod transition;

pub use product::{ChangeState, LifecycleEvent, ProductRecord, ProductView};
pub use replay::{ReplayError, replay};
pub use transition::{can_advance, can_transition};
