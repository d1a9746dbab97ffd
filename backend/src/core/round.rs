//! Round counting for the ensemble
//!
//! The simulation advances in discrete rounds. Every transition and event is
//! stamped with the round it happened in; within a round, order is the order
//! in which the event log and observers received them.

use serde::{Deserialize, Serialize};

/// Tracks the current round.
///
/// # Example
/// ```
/// use tiered_queue_sim_core::RoundClock;
///
/// let mut clock = RoundClock::new();
/// assert_eq!(clock.current_round(), 0);
///
/// clock.advance_round();
/// assert_eq!(clock.current_round(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundClock {
    current_round: usize,
}

impl RoundClock {
    /// Create a clock at round 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a clock at a given round (used when restoring snapshots).
    pub fn at_round(round: usize) -> Self {
        Self {
            current_round: round,
        }
    }

    /// Close the current round and open the next one.
    pub fn advance_round(&mut self) {
        self.current_round += 1;
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }
}
