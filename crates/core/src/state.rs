//! The fixed, linear product lifecycle.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a product.
///
/// Ordering follows the lifecycle: `Created < Packed < Shipped < Delivered`.
/// The numeric wire form (0..=3) is only produced/consumed at the boundary via
/// [`LifecycleState::code`] and [`LifecycleState::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Created,
    Packed,
    Shipped,
    Delivered,
}

impl LifecycleState {
    pub const ALL: [LifecycleState; 4] = [
        LifecycleState::Created,
        LifecycleState::Packed,
        LifecycleState::Shipped,
        LifecycleState::Delivered,
    ];

    pub const INITIAL: LifecycleState = LifecycleState::Created;

    pub fn code(self) -> u8 {
        match self {
            LifecycleState::Created => 0,
            LifecycleState::Packed => 1,
            LifecycleState::Shipped => 2,
            LifecycleState::Delivered => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(LifecycleState::Created),
            1 => Some(LifecycleState::Packed),
            2 => Some(LifecycleState::Shipped),
            3 => Some(LifecycleState::Delivered),
            _ => None,
        }
    }

    /// Display label from the fixed 4-entry mapping.
    pub fn label(self) -> &'static str {
        match self {
            LifecycleState::Created => "Created",
            LifecycleState::Packed => "Packed",
            LifecycleState::Shipped => "Shipped",
            LifecycleState::Delivered => "Delivered",
        }
    }

    pub fn successor(self) -> Option<Self> {
        match self {
            LifecycleState::Created => Some(LifecycleState::Packed),
            LifecycleState::Packed => Some(LifecycleState::Shipped),
            LifecycleState::Shipped => Some(LifecycleState::Delivered),
            LifecycleState::Delivered => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successor().is_none()
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}
