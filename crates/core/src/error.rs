//! Ledger error model.

use thiserror::Error;

use crate::id::ProductId;
use crate::state::LifecycleState;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-level error.
///
/// Validation failures are deterministic and leave no trace in the ledger.
/// `StorageFault` is fatal for the operation that raised it and is surfaced
/// unchanged; the engine never retries it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed input (empty name, empty actor, unparseable id).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The product id was never assigned.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// The product is in a terminal state and accepts no further transitions.
    #[error("product {id} is {state} and accepts no further transitions")]
    InvalidState { id: ProductId, state: LifecycleState },

    /// The requested state is not the immediate successor of the current one.
    #[error("product {id}: illegal transition from {from} to state code {requested}")]
    IllegalTransition {
        id: ProductId,
        from: LifecycleState,
        requested: u8,
    },

    /// Underlying persistence failure.
    #[error("storage fault: {0}")]
    StorageFault(String),
}

impl LedgerError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageFault(msg.into())
    }

    /// Stable machine-readable kind, used by boundary layers.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidArgument(_) => "invalid_argument",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::InvalidState { .. } => "invalid_state",
            LedgerError::IllegalTransition { .. } => "illegal_transition",
            LedgerError::StorageFault(_) => "storage_fault",
        }
    }

    pub fn is_storage_fault(&self) -> bool {
        matches!(self, LedgerError::StorageFault(_))
    }
}
