use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use supplychain_core::{
    ActorId, Aggregate, AggregateRoot, LedgerError, LedgerResult, LifecycleState, ProductId,
};
use supplychain_events::Event;

use crate::transition::can_advance;

pub const CREATED_EVENT_TYPE: &str = "supplychain.product.created";
pub const STATE_CHANGED_EVENT_TYPE: &str = "supplychain.product.state_changed";

/// Aggregate root: a tracked product.
///
/// `id`, `name` and `created_at` are fixed at creation. `state` only moves
/// forward and `owner` follows whoever performed the latest transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    id: ProductId,
    name: String,
    created_at: DateTime<Utc>,
    state: LifecycleState,
    owner: ActorId,
    version: u64,
}

impl ProductRecord {
    /// A freshly created record, as it stands right after its creation event.
    pub fn new(id: ProductId, name: impl Into<String>, creator: ActorId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            state: LifecycleState::INITIAL,
            owner: creator,
            version: 1,
        }
    }

    /// Build the record described by a creation event.
    pub fn from_created(event: &LifecycleEvent) -> Option<Self> {
        if !event.is_creation() {
            return None;
        }
        let name = event.name.clone()?;
        Some(Self::new(event.product_id, name, event.actor.clone(), event.occurred_at))
    }

    pub fn product_id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn owner(&self) -> &ActorId {
        &self.owner
    }

    pub fn is_delivered(&self) -> bool {
        self.state.is_terminal()
    }

    /// Overwrite state and custody, bumping the version.
    ///
    /// Performs no validation: only the ledger engine calls this, after
    /// [`Aggregate::handle`] accepted the transition.
    pub fn transition_to(&mut self, state: LifecycleState, owner: ActorId) {
        self.state = state;
        self.owner = owner;
        self.version += 1;
    }

    /// Undo a [`transition_to`](Self::transition_to) whose event never committed.
    pub fn revert_to(&mut self, state: LifecycleState, owner: ActorId) {
        self.state = state;
        self.owner = owner;
        self.version = self.version.saturating_sub(1);
    }

    /// Validate a product name for creation.
    pub fn validate_name(name: &str) -> LedgerResult<()> {
        if name.trim().is_empty() {
            return Err(LedgerError::invalid_argument("name cannot be empty"));
        }
        Ok(())
    }
}

impl AggregateRoot for ProductRecord {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: move a product to `requested` (wire code of the next state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeState {
    pub product_id: ProductId,
    pub requested: u8,
    pub actor: ActorId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: one lifecycle step of one product.
///
/// The creation event has `previous_state == None` and carries the product
/// name, so a product's events alone rebuild its full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub product_id: ProductId,
    pub previous_state: Option<LifecycleState>,
    pub new_state: LifecycleState,
    pub actor: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn created(
        product_id: ProductId,
        name: impl Into<String>,
        creator: ActorId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            previous_state: None,
            new_state: LifecycleState::INITIAL,
            actor: creator,
            name: Some(name.into()),
            occurred_at,
        }
    }

    pub fn is_creation(&self) -> bool {
        self.previous_state.is_none()
    }
}

impl Event for LifecycleEvent {
    fn event_type(&self) -> &'static str {
        if self.is_creation() {
            CREATED_EVENT_TYPE
        } else {
            STATE_CHANGED_EVENT_TYPE
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl Aggregate for ProductRecord {
    type Command = ChangeState;
    type Event = LifecycleEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        if event.is_creation() {
            if let Some(name) = &event.name {
                self.name = name.clone();
            }
            self.created_at = event.occurred_at;
        }
        self.state = event.new_state;
        self.owner = event.actor.clone();

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, cmd: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if cmd.product_id != self.id {
            return Err(LedgerError::NotFound(cmd.product_id));
        }

        if self.state.is_terminal() {
            return Err(LedgerError::InvalidState {
                id: self.id,
                state: self.state,
            });
        }

        let next = match LifecycleState::from_code(cmd.requested) {
            Some(next) if can_advance(self.state, cmd.requested) => next,
            _ => {
                return Err(LedgerError::IllegalTransition {
                    id: self.id,
                    from: self.state,
                    requested: cmd.requested,
                });
            }
        };

        Ok(vec![LifecycleEvent {
            product_id: self.id,
            previous_state: Some(self.state),
            new_state: next,
            actor: cmd.actor.clone(),
            name: None,
            occurred_at: cmd.occurred_at,
        }])
    }
}

/// Boundary form of a product record: the state travels both as its numeric
/// code and as its display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: u64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub state_code: u8,
    pub state_label: String,
    pub owner: String,
}

impl From<&ProductRecord> for ProductView {
    fn from(record: &ProductRecord) -> Self {
        Self {
            id: record.id.value(),
            name: record.name.clone(),
            created_at: record.created_at,
            state_code: record.state.code(),
            state_label: record.state.label().to_string(),
            owner: record.owner.to_string(),
        }
    }
}
