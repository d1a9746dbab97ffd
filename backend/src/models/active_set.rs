//! Slot-indexed active set
//!
//! Three structures kept in lockstep:
//!
//! - `slots`: slot index → occupant (the positional view a renderer sees)
//! - `occupied`: dense list of occupied slot indices (the draw view)
//! - `free`: vacant slot indices below the high-water mark
//!
//! Uniform selection draws an index into `occupied`, so the result does not
//! depend on where items happen to sit. Removal swap-removes from `occupied`
//! and records the slot in `free`, keeping every operation O(log n) or better.

use crate::models::item::ItemId;
use crate::rng::RngManager;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Occupant {
    item: ItemId,
    /// Index of this slot inside `occupied`
    dense: usize,
}

/// Items currently "in contention", each bound to a slot in `[0, capacity)`
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSet {
    capacity: usize,
    slots: Vec<Option<Occupant>>,
    occupied: Vec<usize>,
    free: BTreeSet<usize>,
}

impl ActiveSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Vec::new(),
            occupied: Vec::new(),
            free: BTreeSet::new(),
        }
    }

    /// Rebuild a set from `(slot, item)` pairs listed in draw order.
    ///
    /// Returns `None` if a slot is out of range or listed twice.
    pub fn from_occupants(capacity: usize, occupants: &[(usize, ItemId)]) -> Option<Self> {
        let mut set = Self::new(capacity);
        for &(slot, item) in occupants {
            if slot >= capacity {
                return None;
            }
            if slot >= set.slots.len() {
                let old_len = set.slots.len();
                set.slots.resize(slot + 1, None);
                set.free.extend(old_len..slot + 1);
            }
            if !set.free.remove(&slot) {
                return None;
            }
            set.place(slot, item);
        }
        Some(set)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Slots still open before the set is full.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    pub fn is_full(&self) -> bool {
        self.available() == 0
    }

    /// The slot the next insertion would take: the lowest vacancy, or the
    /// first never-used slot. `None` when full.
    pub fn next_free_slot(&self) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        Some(self.free.first().copied().unwrap_or(self.slots.len()))
    }

    /// Insert into the next free slot.
    pub fn insert(&mut self, item: ItemId) -> Option<usize> {
        let slot = self.next_free_slot()?;
        if slot == self.slots.len() {
            self.slots.push(None);
        } else {
            self.free.remove(&slot);
        }
        self.place(slot, item);
        Some(slot)
    }

    /// Put `item` back into a slot that was just vacated.
    ///
    /// Returns `false` (and leaves the set untouched) if the slot is occupied
    /// or was never part of the set.
    pub fn refill(&mut self, slot: usize, item: ItemId) -> bool {
        if !self.free.remove(&slot) {
            return false;
        }
        self.place(slot, item);
        true
    }

    fn place(&mut self, slot: usize, item: ItemId) {
        let dense = self.occupied.len();
        self.occupied.push(slot);
        self.slots[slot] = Some(Occupant { item, dense });
    }

    /// Vacate `slot`, returning its occupant.
    pub fn remove(&mut self, slot: usize) -> Option<ItemId> {
        let occupant = self.slots.get_mut(slot)?.take()?;

        self.occupied.swap_remove(occupant.dense);
        if let Some(&moved_slot) = self.occupied.get(occupant.dense) {
            if let Some(moved) = self.slots[moved_slot].as_mut() {
                moved.dense = occupant.dense;
            }
        }
        self.free.insert(slot);

        Some(occupant.item)
    }

    /// Pick an occupied slot uniformly at random.
    pub fn choose_slot(&self, rng: &mut RngManager) -> Option<usize> {
        if self.occupied.is_empty() {
            return None;
        }
        Some(self.occupied[rng.index(self.occupied.len())])
    }

    pub fn get(&self, slot: usize) -> Option<ItemId> {
        self.slots.get(slot).copied().flatten().map(|o| o.item)
    }

    pub fn slot_of(&self, item: ItemId) -> Option<usize> {
        self.slots
            .iter()
            .position(|o| o.map(|o| o.item) == Some(item))
    }

    /// Occupants in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, ItemId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, o)| o.map(|o| (slot, o.item)))
    }

    /// Occupants in draw order; feed back into [`ActiveSet::from_occupants`]
    /// to reproduce future random picks exactly.
    pub fn occupants_in_draw_order(&self) -> Vec<(usize, ItemId)> {
        self.occupied
            .iter()
            .filter_map(|&slot| self.get(slot).map(|item| (slot, item)))
            .collect()
    }
}
