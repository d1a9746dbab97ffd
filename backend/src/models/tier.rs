//! Tier: one priority class's backlog → active → confirmed pipeline
//!
//! Each tier owns three disjoint containers:
//!
//! - **backlog**: FIFO, unbounded. Each entry remembers the slot it was
//!   drawn at; removing the head does not shift the others.
//! - **active**: slot-indexed set bounded by the active grid's capacity.
//! - **confirmed**: append-only log.
//!
//! # Critical Invariants
//!
//! 1. Every item ever created is in exactly one container
//! 2. `active.len() <= active_capacity`
//! 3. `confirmed` only grows
//!
//! All randomness comes in through the `&mut RngManager` argument of
//! [`Tier::confirm_one`]; the tier holds no generator of its own.

use crate::core::grid::{Grid, GridDimensions};
use crate::models::active_set::ActiveSet;
use crate::models::item::{ItemId, TierId};
use crate::models::layout::TierLayout;
use crate::models::transition::{Container, Transition};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// What to do when a direct-to-active arrival finds the active set full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Refuse the whole request; nothing is created
    #[default]
    Reject,
    /// Fill the active set, send the remainder to the backlog
    Redirect,
}

/// Errors that can occur during tier operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TierError {
    #[error("Active set capacity exceeded: requested {requested}, available {available}")]
    CapacityExceeded { requested: usize, available: usize },

    #[error("Tier invariant violated: {0}")]
    InvariantViolation(String),
}

/// A backlog entry and the slot it was assigned on arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogEntry {
    pub item: ItemId,
    pub slot: usize,
}

/// Static description handed to a renderer once per tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierDescriptor {
    pub id: TierId,
    pub label: String,
    pub layout: TierLayout,
    pub backlog_dims: GridDimensions,
    pub active_dims: GridDimensions,
}

impl TierDescriptor {
    pub fn active_capacity(&self) -> usize {
        self.active_dims.capacity()
    }

    /// Number of backlog entries that have a drawable position
    pub fn backlog_visual_capacity(&self) -> usize {
        self.backlog_dims.capacity()
    }
}

/// Point-in-time container sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    pub id: TierId,
    pub label: String,
    pub backlog_len: usize,
    pub active_len: usize,
    pub confirmed_len: usize,
    pub total_enqueued: u64,
    pub active_capacity: usize,
}

/// One priority class's independent queue model
#[derive(Debug, Clone)]
pub struct Tier {
    id: TierId,
    label: String,
    layout: TierLayout,
    overflow: OverflowPolicy,
    backlog_grid: Grid,
    active_grid: Grid,
    backlog: VecDeque<BacklogEntry>,
    active: ActiveSet,
    confirmed: Vec<ItemId>,
    /// Next sequence number; equals the number of items ever created
    next_seq: u64,
}

impl Tier {
    /// Create an empty tier. Capacities are fixed here from the layout.
    ///
    /// # Example
    /// ```
    /// use tiered_queue_sim_core::models::{OverflowPolicy, Tier, TierId, TierLayout};
    ///
    /// let tier = Tier::new(TierId(0), "1X ... 3X", TierLayout::default(), OverflowPolicy::Reject);
    /// assert_eq!(tier.active_capacity(), 60);
    /// assert_eq!(tier.backlog_len(), 0);
    /// ```
    pub fn new(
        id: TierId,
        label: impl Into<String>,
        layout: TierLayout,
        overflow: OverflowPolicy,
    ) -> Self {
        let backlog_grid = layout.backlog_grid();
        let active_grid = layout.active_grid();
        let active = ActiveSet::new(active_grid.capacity());
        Self {
            id,
            label: label.into(),
            layout,
            overflow,
            backlog_grid,
            active_grid,
            backlog: VecDeque::new(),
            active,
            confirmed: Vec::new(),
            next_seq: 0,
        }
    }

    /// Rebuild a tier from saved containers.
    ///
    /// `active` must be in draw order (see [`ActiveSet::occupants_in_draw_order`]).
    /// Fails if the containers break any tier invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TierId,
        label: impl Into<String>,
        layout: TierLayout,
        overflow: OverflowPolicy,
        backlog: Vec<BacklogEntry>,
        active: &[(usize, ItemId)],
        confirmed: Vec<ItemId>,
        next_seq: u64,
    ) -> Result<Self, TierError> {
        let mut tier = Self::new(id, label, layout, overflow);
        tier.active = ActiveSet::from_occupants(tier.active_grid.capacity(), active).ok_or_else(
            || TierError::InvariantViolation("active slots out of range or duplicated".to_string()),
        )?;
        tier.backlog = backlog.into();
        tier.confirmed = confirmed;
        tier.next_seq = next_seq;
        tier.check_invariants()?;
        Ok(tier)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create `count` new items.
    ///
    /// Backlog arrivals go to the tail at slot `len − 1` (post-append).
    /// Direct arrivals take the lowest vacant active slot; what happens past
    /// capacity depends on the tier's [`OverflowPolicy`]. Under `Reject` the
    /// request fails as a whole before anything is created.
    pub fn enqueue(
        &mut self,
        count: usize,
        direct_to_active: bool,
    ) -> Result<Vec<Transition>, TierError> {
        if direct_to_active && self.overflow == OverflowPolicy::Reject {
            let available = self.active.available();
            if count > available {
                tracing::warn!(
                    tier = %self.id,
                    requested = count,
                    available,
                    "direct arrival rejected, active set full"
                );
                return Err(TierError::CapacityExceeded {
                    requested: count,
                    available,
                });
            }
        }

        let mut transitions = Vec::with_capacity(count);
        for _ in 0..count {
            let item = self.allocate();
            let transition = if direct_to_active {
                match self.active.insert(item) {
                    Some(slot) => Transition {
                        item,
                        from: Container::Arrival,
                        from_slot: None,
                        to: Container::Active,
                        to_slot: slot,
                        to_position: self.active_grid.try_slot_position(slot),
                        redirected: false,
                    },
                    None => self.push_backlog(item, true),
                }
            } else {
                self.push_backlog(item, false)
            };
            transitions.push(transition);
        }

        tracing::debug!(
            tier = %self.id,
            count,
            direct_to_active,
            backlog = self.backlog.len(),
            active = self.active.len(),
            "enqueued"
        );
        Ok(transitions)
    }

    /// One promotion-and-confirmation step.
    ///
    /// 1. Active non-empty: confirm a uniformly random occupant; the backlog
    ///    head (if any) takes over its slot.
    /// 2. Active empty, backlog non-empty: the backlog head passes through
    ///    the first active slot straight into the confirmed log.
    /// 3. Both empty: nothing happens and no transitions are returned.
    pub fn confirm_one(&mut self, rng: &mut RngManager) -> Vec<Transition> {
        let mut transitions = Vec::with_capacity(2);

        if let Some(slot) = self.active.choose_slot(rng) {
            if let Some(item) = self.active.remove(slot) {
                transitions.push(self.push_confirmed(item, Container::Active, Some(slot)));
            }

            if let Some(head) = self.backlog.pop_front() {
                if self.active.refill(slot, head.item) {
                    transitions.push(Transition {
                        item: head.item,
                        from: Container::Backlog,
                        from_slot: Some(head.slot),
                        to: Container::Active,
                        to_slot: slot,
                        to_position: self.active_grid.try_slot_position(slot),
                        redirected: false,
                    });
                } else {
                    self.backlog.push_front(head);
                }
            }
        } else if let Some(head) = self.backlog.pop_front() {
            match self.active.insert(head.item) {
                Some(slot) => {
                    transitions.push(Transition {
                        item: head.item,
                        from: Container::Backlog,
                        from_slot: Some(head.slot),
                        to: Container::Active,
                        to_slot: slot,
                        to_position: self.active_grid.try_slot_position(slot),
                        redirected: false,
                    });
                    self.active.remove(slot);
                    transitions.push(self.push_confirmed(head.item, Container::Active, Some(slot)));
                }
                // No active region to pass through
                None => {
                    transitions.push(self.push_confirmed(
                        head.item,
                        Container::Backlog,
                        Some(head.slot),
                    ));
                }
            }
        }

        if !transitions.is_empty() {
            tracing::debug!(
                tier = %self.id,
                moves = transitions.len(),
                confirmed = self.confirmed.len(),
                "confirmed one"
            );
        }
        transitions
    }

    /// Repack backlog slots to `0..len` in queue order.
    ///
    /// Only entries whose slot changes produce a transition.
    pub fn reflow_backlog(&mut self) -> Vec<Transition> {
        let grid = self.backlog_grid;
        self.backlog
            .iter_mut()
            .enumerate()
            .filter(|(index, entry)| entry.slot != *index)
            .map(|(index, entry)| {
                let from_slot = entry.slot;
                entry.slot = index;
                Transition {
                    item: entry.item,
                    from: Container::Backlog,
                    from_slot: Some(from_slot),
                    to: Container::Backlog,
                    to_slot: index,
                    to_position: grid.try_slot_position(index),
                    redirected: false,
                }
            })
            .collect()
    }

    fn allocate(&mut self) -> ItemId {
        let item = ItemId::new(self.id, self.next_seq);
        self.next_seq += 1;
        item
    }

    fn push_backlog(&mut self, item: ItemId, redirected: bool) -> Transition {
        let slot = self.backlog.len();
        self.backlog.push_back(BacklogEntry { item, slot });
        Transition {
            item,
            from: Container::Arrival,
            from_slot: None,
            to: Container::Backlog,
            to_slot: slot,
            to_position: self.backlog_grid.try_slot_position(slot),
            redirected,
        }
    }

    fn push_confirmed(&mut self, item: ItemId, from: Container, from_slot: Option<usize>) -> Transition {
        let index = self.confirmed.len();
        self.confirmed.push(item);
        Transition {
            item,
            from,
            from_slot,
            to: Container::Confirmed,
            to_slot: index,
            to_position: Some(self.layout.confirmed_position(index)),
            redirected: false,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn id(&self) -> TierId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &TierLayout {
        &self.layout
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    pub fn active_capacity(&self) -> usize {
        self.active.capacity()
    }

    pub fn backlog_visual_capacity(&self) -> usize {
        self.backlog_grid.capacity()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn confirmed_len(&self) -> usize {
        self.confirmed.len()
    }

    /// Items created since the tier was built.
    pub fn total_enqueued(&self) -> u64 {
        self.next_seq
    }

    /// Backlog entries, head first.
    pub fn backlog(&self) -> impl Iterator<Item = &BacklogEntry> + '_ {
        self.backlog.iter()
    }

    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    pub fn confirmed(&self) -> &[ItemId] {
        &self.confirmed
    }

    pub fn descriptor(&self) -> TierDescriptor {
        TierDescriptor {
            id: self.id,
            label: self.label.clone(),
            layout: self.layout.clone(),
            backlog_dims: self.backlog_grid.dims(),
            active_dims: self.active_grid.dims(),
        }
    }

    pub fn stats(&self) -> TierStats {
        TierStats {
            id: self.id,
            label: self.label.clone(),
            backlog_len: self.backlog.len(),
            active_len: self.active.len(),
            confirmed_len: self.confirmed.len(),
            total_enqueued: self.next_seq,
            active_capacity: self.active.capacity(),
        }
    }

    /// Verify the container invariants.
    ///
    /// Checks conservation (every created item present exactly once),
    /// ownership (every item tagged with this tier) and the capacity bound.
    pub fn check_invariants(&self) -> Result<(), TierError> {
        if self.active.len() > self.active.capacity() {
            return Err(TierError::InvariantViolation(format!(
                "{} active items exceed capacity {}",
                self.active.len(),
                self.active.capacity()
            )));
        }

        let all = self
            .backlog
            .iter()
            .map(|entry| entry.item)
            .chain(self.active.iter().map(|(_, item)| item))
            .chain(self.confirmed.iter().copied());

        let mut seen = HashSet::new();
        for item in all {
            if item.tier != self.id || item.seq >= self.next_seq {
                return Err(TierError::InvariantViolation(format!(
                    "{} does not belong to {}",
                    item, self.id
                )));
            }
            if !seen.insert(item) {
                return Err(TierError::InvariantViolation(format!(
                    "{} appears more than once",
                    item
                )));
            }
        }

        if seen.len() as u64 != self.next_seq {
            return Err(TierError::InvariantViolation(format!(
                "{} items accounted for, {} created",
                seen.len(),
                self.next_seq
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit-spaced layout: active capacity is `floor(active_width) * floor(height)`.
    fn unit_layout(active_width: f64, height: f64) -> TierLayout {
        TierLayout {
            center_x: 0.0,
            center_y: 0.0,
            height,
            backlog_width: 4.0,
            active_width,
            spacing: 1.0,
            margin: 0.0,
        }
    }

    #[test]
    fn test_unit_layout_capacity() {
        let tier = Tier::new(TierId(0), "t", unit_layout(3.0, 2.0), OverflowPolicy::Reject);
        assert_eq!(tier.active_capacity(), 6);
    }

    #[test]
    fn test_backlog_slots_follow_length() {
        let mut tier = Tier::new(TierId(0), "t", TierLayout::default(), OverflowPolicy::Reject);
        let moves = tier.enqueue(3, false).unwrap();
        let slots: Vec<_> = moves.iter().map(|t| t.to_slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
        assert!(moves.iter().all(|t| t.to == Container::Backlog));
    }

    #[test]
    fn test_reject_is_atomic() {
        let mut tier = Tier::new(TierId(0), "t", unit_layout(2.0, 1.0), OverflowPolicy::Reject);
        assert_eq!(tier.active_capacity(), 2);

        let err = tier.enqueue(3, true).unwrap_err();
        assert_eq!(err, TierError::CapacityExceeded { requested: 3, available: 2 });
        assert_eq!(tier.total_enqueued(), 0);
        assert_eq!(tier.active_len(), 0);
    }

    #[test]
    fn test_redirect_sends_overflow_to_backlog() {
        let mut tier = Tier::new(TierId(0), "t", unit_layout(2.0, 1.0), OverflowPolicy::Redirect);
        let moves = tier.enqueue(3, true).unwrap();
        assert_eq!(tier.active_len(), 2);
        assert_eq!(tier.backlog_len(), 1);
        assert!(moves[2].redirected);
        assert_eq!(moves[2].to, Container::Backlog);
    }

    #[test]
    fn test_reflow_compacts_after_head_removal() {
        let mut tier = Tier::new(TierId(0), "t", TierLayout::default(), OverflowPolicy::Reject);
        tier.enqueue(3, false).unwrap();
        let mut rng = RngManager::new(1);
        tier.confirm_one(&mut rng);

        let slots: Vec<_> = tier.backlog().map(|e| e.slot).collect();
        assert_eq!(slots, vec![1, 2]);

        let moves = tier.reflow_backlog();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].from_slot, Some(1));
        assert_eq!(moves[0].to_slot, 0);
        assert!(tier.reflow_backlog().is_empty());
    }

    #[test]
    fn test_invariants_catch_duplicates() {
        let item = ItemId::new(TierId(0), 0);
        let result = Tier::from_parts(
            TierId(0),
            "t",
            TierLayout::default(),
            OverflowPolicy::Reject,
            vec![BacklogEntry { item, slot: 0 }],
            &[],
            vec![item],
            1,
        );
        assert!(matches!(result, Err(TierError::InvariantViolation(_))));
    }

    #[test]
    fn test_invariants_catch_lost_items() {
        let result = Tier::from_parts(
            TierId(0),
            "t",
            TierLayout::default(),
            OverflowPolicy::Reject,
            vec![],
            &[],
            vec![ItemId::new(TierId(0), 0)],
            2,
        );
        assert!(matches!(result, Err(TierError::InvariantViolation(_))));
    }

    #[test]
    fn test_invariants_catch_foreign_items() {
        let result = Tier::from_parts(
            TierId(0),
            "t",
            TierLayout::default(),
            OverflowPolicy::Reject,
            vec![],
            &[],
            vec![ItemId::new(TierId(1), 0)],
            1,
        );
        assert!(matches!(result, Err(TierError::InvariantViolation(_))));
    }
}
