//! Renderer-facing observer contract
//!
//! The simulator never draws. Anything that visualizes it (an animation
//! script, a JSON-lines exporter, a test) implements [`TransitionObserver`]
//! and is attached to the ensemble.
//!
//! Call order per observer:
//!
//! 1. `tier_configured` once per tier, when attached
//! 2. `transitions` after every state-mutating operation, in the order the
//!    moves must be shown
//! 3. `round_completed` at each round boundary

use crate::models::{TierDescriptor, TierId, Transition};
use crate::orchestrator::engine::RoundResult;
use std::cell::RefCell;
use std::rc::Rc;

pub trait TransitionObserver {
    /// Static tier description, delivered once.
    fn tier_configured(&mut self, _descriptor: &TierDescriptor) {}

    /// Moves produced by one operation on `tier` during `round`.
    fn transitions(&mut self, round: usize, tier: TierId, transitions: &[Transition]);

    fn round_completed(&mut self, _result: &RoundResult) {}
}

/// Lets a caller keep a handle on an observer the ensemble owns.
impl<T: TransitionObserver + ?Sized> TransitionObserver for Rc<RefCell<T>> {
    fn tier_configured(&mut self, descriptor: &TierDescriptor) {
        self.borrow_mut().tier_configured(descriptor);
    }

    fn transitions(&mut self, round: usize, tier: TierId, transitions: &[Transition]) {
        self.borrow_mut().transitions(round, tier, transitions);
    }

    fn round_completed(&mut self, result: &RoundResult) {
        self.borrow_mut().round_completed(result);
    }
}

/// One operation's worth of moves
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionBatch {
    pub round: usize,
    pub tier: TierId,
    pub transitions: Vec<Transition>,
}

/// Keeps everything it is told; handy in tests and for offline replay.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    pub descriptors: Vec<TierDescriptor>,
    pub batches: Vec<TransitionBatch>,
    pub rounds: Vec<RoundResult>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded transitions, flattened in delivery order
    pub fn all_transitions(&self) -> impl Iterator<Item = &Transition> + '_ {
        self.batches.iter().flat_map(|b| b.transitions.iter())
    }
}

impl TransitionObserver for RecordingObserver {
    fn tier_configured(&mut self, descriptor: &TierDescriptor) {
        self.descriptors.push(descriptor.clone());
    }

    fn transitions(&mut self, round: usize, tier: TierId, transitions: &[Transition]) {
        self.batches.push(TransitionBatch {
            round,
            tier,
            transitions: transitions.to_vec(),
        });
    }

    fn round_completed(&mut self, result: &RoundResult) {
        self.rounds.push(result.clone());
    }
}
