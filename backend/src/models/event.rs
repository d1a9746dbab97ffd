//! Event logging for replay and inspection.
//!
//! Every transition a tier emits is recorded as an [`Event`] stamped with the
//! round it happened in, alongside ensemble-level events (rejected arrivals,
//! round boundaries). Two runs with the same seed and config produce equal
//! logs, which is what the determinism tests compare.
//!
//! # Example
//!
//! ```rust
//! use tiered_queue_sim_core::models::{Event, EventLog, ItemId, TierId};
//!
//! let mut log = EventLog::new();
//! log.log(Event::Promotion {
//!     round: 3,
//!     tier: TierId(0),
//!     item: ItemId::new(TierId(0), 12),
//!     from_slot: Some(0),
//!     to_slot: 5,
//! });
//!
//! assert_eq!(log.events_in_round(3).len(), 1);
//! ```

use crate::models::item::{ItemId, TierId};
use crate::models::transition::{Container, Transition, TransitionKind};
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// New item placed in the backlog or the active set
    Arrival {
        round: usize,
        tier: TierId,
        item: ItemId,
        container: Container,
        slot: usize,
    },

    /// New item that asked for the active set but overflowed into the backlog
    Redirected {
        round: usize,
        tier: TierId,
        item: ItemId,
        slot: usize,
    },

    /// Backlog item moved into an active slot
    Promotion {
        round: usize,
        tier: TierId,
        item: ItemId,
        from_slot: Option<usize>,
        to_slot: usize,
    },

    /// Item appended to the confirmed log
    Confirmation {
        round: usize,
        tier: TierId,
        item: ItemId,
        from: Container,
        from_slot: Option<usize>,
        confirmed_index: usize,
    },

    /// Backlog item reassigned to a new slot
    Reflow {
        round: usize,
        tier: TierId,
        item: ItemId,
        from_slot: Option<usize>,
        to_slot: usize,
    },

    /// Direct-to-active request refused for lack of room
    CapacityRejected {
        round: usize,
        tier: TierId,
        requested: usize,
        available: usize,
    },

    /// Round boundary
    RoundCompleted {
        round: usize,
        arrivals: usize,
        confirmations: usize,
    },
}

impl Event {
    /// Build the event describing one tier transition.
    pub fn from_transition(round: usize, tier: TierId, transition: &Transition) -> Self {
        let item = transition.item;
        match transition.kind() {
            TransitionKind::Arrival => Event::Arrival {
                round,
                tier,
                item,
                container: transition.to,
                slot: transition.to_slot,
            },
            TransitionKind::Redirected => Event::Redirected {
                round,
                tier,
                item,
                slot: transition.to_slot,
            },
            TransitionKind::Promotion => Event::Promotion {
                round,
                tier,
                item,
                from_slot: transition.from_slot,
                to_slot: transition.to_slot,
            },
            TransitionKind::Confirmation => Event::Confirmation {
                round,
                tier,
                item,
                from: transition.from,
                from_slot: transition.from_slot,
                confirmed_index: transition.to_slot,
            },
            TransitionKind::Reflow => Event::Reflow {
                round,
                tier,
                item,
                from_slot: transition.from_slot,
                to_slot: transition.to_slot,
            },
        }
    }

    /// Round in which this event occurred
    pub fn round(&self) -> usize {
        match self {
            Event::Arrival { round, .. }
            | Event::Redirected { round, .. }
            | Event::Promotion { round, .. }
            | Event::Confirmation { round, .. }
            | Event::Reflow { round, .. }
            | Event::CapacityRejected { round, .. }
            | Event::RoundCompleted { round, .. } => *round,
        }
    }

    /// Short name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Arrival { .. } => "Arrival",
            Event::Redirected { .. } => "Redirected",
            Event::Promotion { .. } => "Promotion",
            Event::Confirmation { .. } => "Confirmation",
            Event::Reflow { .. } => "Reflow",
            Event::CapacityRejected { .. } => "CapacityRejected",
            Event::RoundCompleted { .. } => "RoundCompleted",
        }
    }

    /// Tier the event belongs to, if any
    pub fn tier(&self) -> Option<TierId> {
        match self {
            Event::Arrival { tier, .. }
            | Event::Redirected { tier, .. }
            | Event::Promotion { tier, .. }
            | Event::Confirmation { tier, .. }
            | Event::Reflow { tier, .. }
            | Event::CapacityRejected { tier, .. } => Some(*tier),
            Event::RoundCompleted { .. } => None,
        }
    }

    /// Item the event moved, if any
    pub fn item(&self) -> Option<ItemId> {
        match self {
            Event::Arrival { item, .. }
            | Event::Redirected { item, .. }
            | Event::Promotion { item, .. }
            | Event::Confirmation { item, .. }
            | Event::Reflow { item, .. } => Some(*item),
            Event::CapacityRejected { .. } | Event::RoundCompleted { .. } => None,
        }
    }
}

/// Append-only store of events with query helpers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_in_round(&self, round: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.round() == round).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    pub fn events_for_tier(&self, tier: TierId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.tier() == Some(tier))
            .collect()
    }

    /// Full history of one item, in order
    pub fn events_for_item(&self, item: ItemId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.item() == Some(item))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(seq: u64) -> ItemId {
        ItemId::new(TierId(1), seq)
    }

    fn confirmation(round: usize, seq: u64) -> Event {
        Event::Confirmation {
            round,
            tier: TierId(1),
            item: item(seq),
            from: Container::Active,
            from_slot: Some(0),
            confirmed_index: 0,
        }
    }

    #[test]
    fn test_from_transition_maps_kinds() {
        let promotion = Transition {
            item: item(4),
            from: Container::Backlog,
            from_slot: Some(2),
            to: Container::Active,
            to_slot: 7,
            to_position: None,
            redirected: false,
        };
        assert_eq!(
            Event::from_transition(5, TierId(1), &promotion),
            Event::Promotion {
                round: 5,
                tier: TierId(1),
                item: item(4),
                from_slot: Some(2),
                to_slot: 7,
            }
        );
    }

    #[test]
    fn test_accessors() {
        let event = confirmation(9, 3);
        assert_eq!(event.round(), 9);
        assert_eq!(event.event_type(), "Confirmation");
        assert_eq!(event.tier(), Some(TierId(1)));
        assert_eq!(event.item(), Some(item(3)));

        let boundary = Event::RoundCompleted {
            round: 9,
            arrivals: 0,
            confirmations: 1,
        };
        assert_eq!(boundary.tier(), None);
        assert_eq!(boundary.item(), None);
    }

    #[test]
    fn test_log_queries() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.log(confirmation(1, 0));
        log.log(confirmation(2, 1));
        log.log(Event::RoundCompleted {
            round: 2,
            arrivals: 0,
            confirmations: 1,
        });

        assert_eq!(log.len(), 3);
        assert_eq!(log.events_in_round(2).len(), 2);
        assert_eq!(log.events_of_type("Confirmation").len(), 2);
        assert_eq!(log.events_for_tier(TierId(1)).len(), 2);
        assert_eq!(log.events_for_item(item(1)).len(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_serialized_tag() {
        let json = serde_json::to_value(confirmation(0, 0)).unwrap();
        assert_eq!(json["type"], "confirmation");
    }
}
