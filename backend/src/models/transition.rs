//! Transitions: the unit of the renderer contract
//!
//! Every tier operation returns the moves it made as an ordered list of
//! [`Transition`]s. A renderer plays them back in order; the event log is
//! derived from them.

use crate::core::grid::Position;
use crate::models::item::ItemId;
use serde::{Deserialize, Serialize};

/// Where an item can be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// Not yet in the tier (source of an arrival)
    Arrival,
    Backlog,
    Active,
    Confirmed,
}

/// One item moving from one container/slot to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub item: ItemId,
    pub from: Container,
    /// Slot the item left; `None` for arrivals
    pub from_slot: Option<usize>,
    pub to: Container,
    /// Backlog slot, active slot, or index in the confirmed log
    pub to_slot: usize,
    /// Drawable target; `None` when the slot lies past the region's visual capacity
    pub to_position: Option<Position>,
    /// Set on arrivals that asked for the active set but were sent to the backlog
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub redirected: bool,
}

/// Semantic classification of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// New item into the backlog or the active set
    Arrival,
    /// New item that overflowed the active set into the backlog
    Redirected,
    /// Backlog → active
    Promotion,
    /// Active (or backlog) → confirmed
    Confirmation,
    /// Backlog slot reassignment
    Reflow,
}

impl Transition {
    pub fn kind(&self) -> TransitionKind {
        match (self.from, self.to) {
            (Container::Arrival, _) if self.redirected => TransitionKind::Redirected,
            (Container::Arrival, _) => TransitionKind::Arrival,
            (_, Container::Confirmed) => TransitionKind::Confirmation,
            (Container::Backlog, Container::Active) => TransitionKind::Promotion,
            _ => TransitionKind::Reflow,
        }
    }
}
