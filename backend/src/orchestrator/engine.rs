//! Ensemble Engine
//!
//! Drives a fixed, ordered set of tiers through rounds:
//!
//! ```text
//! For each round r:
//! 1. Run scripted actions due in round r (scenario order)
//! 2. Sample arrivals per tier (Bernoulli / Poisson / fixed) and enqueue
//! 3. Run each tier's automatic confirmations
//! 4. Log RoundCompleted, notify observers
//! 5. Advance the round counter
//! ```
//!
//! Tiers share nothing but the ensemble's RNG stream; within a round they are
//! visited in index order, so a seed fixes the whole run.
//!
//! # Example
//!
//! ```rust
//! use tiered_queue_sim_core::orchestrator::{Ensemble, EnsembleConfig};
//! use tiered_queue_sim_core::models::TierId;
//!
//! let mut ensemble = Ensemble::new(EnsembleConfig::reference()).unwrap();
//! ensemble.run_scenario().unwrap();
//!
//! let top = ensemble.tier(TierId(0)).unwrap();
//! assert_eq!(top.active_len(), 60);
//! assert_eq!(top.confirmed_len(), 5);
//! ```

use crate::arrivals::{ArrivalConfig, ArrivalDistribution, ArrivalGenerator};
use crate::core::grid::{GridError, Position};
use crate::core::round::RoundClock;
use crate::events::{reference_scenario, ScenarioHandler, ScheduledAction, ScriptedAction};
use crate::models::{
    Event, EventLog, OverflowPolicy, Tier, TierError, TierId, TierLayout, TierStats, Transition,
    TransitionKind,
};
use crate::orchestrator::checkpoint::{
    compute_config_hash, validate_snapshot, EnsembleSnapshot, TierSnapshot,
};
use crate::orchestrator::observer::TransitionObserver;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete ensemble configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// RNG seed for deterministic simulation
    #[serde(default)]
    pub rng_seed: u64,

    /// Tiers in priority order (index 0 first)
    pub tiers: Vec<TierConfig>,

    /// Scripted actions
    #[serde(default)]
    pub scenario: Vec<ScheduledAction>,
}

/// Per-tier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Priority class label shown next to the tier
    pub label: String,

    #[serde(default)]
    pub layout: TierLayout,

    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Random arrivals (None = scripted arrivals only)
    #[serde(default)]
    pub arrival: Option<ArrivalConfig>,

    /// `confirm_one` calls per round
    #[serde(default)]
    pub confirmations_per_round: usize,

    /// Items placed in the backlog before round 0 (clamped to the visual capacity)
    #[serde(default)]
    pub initial_backlog: usize,

    /// Items placed in the active set before round 0 (clamped to capacity)
    #[serde(default)]
    pub initial_active: usize,
}

impl TierConfig {
    pub fn new(label: impl Into<String>, layout: TierLayout) -> Self {
        Self {
            label: label.into(),
            layout,
            overflow: OverflowPolicy::default(),
            arrival: None,
            confirmations_per_round: 0,
            initial_backlog: 0,
            initial_active: 0,
        }
    }
}

const REFERENCE_LABELS: [&str; 3] = ["<0.000001X", "1X ... 3X", "10X ... 30X"];
const REFERENCE_CENTERS_Y: [f64; 3] = [1.5, 0.0, -1.5];

impl EnsembleConfig {
    /// The three-tier explainer: fully scripted by [`reference_scenario`].
    pub fn reference() -> Self {
        let tiers = REFERENCE_LABELS
            .iter()
            .zip(REFERENCE_CENTERS_Y)
            .map(|(label, y)| TierConfig::new(*label, TierLayout::centered_at(0.0, y)))
            .collect();

        Self {
            rng_seed: 42,
            tiers,
            scenario: reference_scenario(),
        }
    }

    /// Same three tiers, driven by random arrivals instead of a script.
    ///
    /// The top tier receives bursts into its backlog; the lower tiers receive
    /// single items straight into their active sets. Every tier confirms one
    /// item per round.
    pub fn randomized(rng_seed: u64) -> Self {
        let arrivals = [
            ArrivalConfig {
                distribution: ArrivalDistribution::Bernoulli {
                    probability: 0.6,
                    batch_size: 5,
                },
                direct_to_active: false,
            },
            ArrivalConfig::bernoulli(0.7, true),
            ArrivalConfig::bernoulli(0.8, true),
        ];

        let tiers = REFERENCE_LABELS
            .iter()
            .zip(REFERENCE_CENTERS_Y)
            .zip(arrivals)
            .map(|((label, y), arrival)| TierConfig {
                overflow: OverflowPolicy::Redirect,
                arrival: Some(arrival),
                confirmations_per_round: 1,
                ..TierConfig::new(*label, TierLayout::centered_at(0.0, y))
            })
            .collect();

        Self {
            rng_seed,
            tiers,
            scenario: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json)
            .map_err(|e| SimulationError::InvalidConfig(format!("Config parse failed: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.tiers.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "Must have at least one tier".to_string(),
            ));
        }

        for (index, tier) in self.tiers.iter().enumerate() {
            let layout = &tier.layout;
            if !(layout.spacing.is_finite() && layout.spacing > 0.0) {
                return Err(SimulationError::InvalidConfig(format!(
                    "tier {}: spacing must be positive, got {}",
                    index, layout.spacing
                )));
            }

            let dimensions = [
                ("height", layout.height),
                ("backlog_width", layout.backlog_width),
                ("active_width", layout.active_width),
                ("margin", layout.margin),
            ];
            for (name, value) in dimensions {
                if !value.is_finite() || value < 0.0 {
                    return Err(SimulationError::InvalidConfig(format!(
                        "tier {}: {} must be a non-negative number, got {}",
                        index, name, value
                    )));
                }
            }

            let grids = [
                ("active", layout.active_grid().dims()),
                ("backlog", layout.backlog_grid().dims()),
            ];
            for (region, dims) in grids {
                if dims.checked_capacity().is_none() {
                    return Err(SimulationError::InvalidConfig(format!(
                        "tier {}: {} region of {} columns x {} rows is too large",
                        index, region, dims.columns, dims.rows
                    )));
                }
            }

            if let Some(arrival) = &tier.arrival {
                arrival.validate().map_err(|msg| {
                    SimulationError::InvalidConfig(format!("tier {}: {}", index, msg))
                })?;
            }
        }

        for scheduled in &self.scenario {
            let tier = scheduled.action.tier();
            if tier.0 >= self.tiers.len() {
                return Err(SimulationError::InvalidConfig(format!(
                    "scenario action names unknown {}",
                    tier
                )));
            }
            if let crate::events::ActionSchedule::Repeating { interval: 0, .. } =
                scheduled.schedule
            {
                return Err(SimulationError::InvalidConfig(
                    "repeating schedule interval must be > 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Results and Errors
// ============================================================================

/// Result of a single round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub round: usize,

    /// Items created this round (scripted + random)
    pub arrivals: usize,

    /// Items appended to confirmed logs this round
    pub confirmations: usize,

    /// Backlog → active moves this round
    pub promotions: usize,

    /// Direct-to-active requests refused for lack of room
    pub rejections: usize,

    /// Container sizes at the end of the round
    pub stats: Vec<TierStats>,
}

/// Simulation error types
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Tier not found: {0}")]
    TierNotFound(TierId),

    #[error(transparent)]
    Tier(#[from] TierError),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),
}

/// Per-round tallies built up while the round runs
#[derive(Debug, Default)]
struct RoundTally {
    arrivals: usize,
    confirmations: usize,
    promotions: usize,
    rejections: usize,
}

impl RoundTally {
    fn count(&mut self, transitions: &[Transition]) {
        for transition in transitions {
            match transition.kind() {
                TransitionKind::Arrival | TransitionKind::Redirected => self.arrivals += 1,
                TransitionKind::Confirmation => self.confirmations += 1,
                TransitionKind::Promotion => self.promotions += 1,
                TransitionKind::Reflow => {}
            }
        }
    }
}

// ============================================================================
// Ensemble
// ============================================================================

/// Owns the tiers, the RNG and the event log, and runs rounds.
///
/// # Determinism
///
/// All randomness flows through one seeded xorshift64* stream. Same seed +
/// same config = identical event log.
pub struct Ensemble {
    run_id: Uuid,
    config: EnsembleConfig,
    tiers: Vec<Tier>,
    rng: RngManager,
    clock: RoundClock,
    arrivals: ArrivalGenerator,
    scenario: ScenarioHandler,
    event_log: EventLog,
    observers: Vec<Box<dyn TransitionObserver>>,
}

impl Ensemble {
    /// Build an ensemble from configuration.
    ///
    /// Tiers are created empty, then pre-filled from `initial_active` and
    /// `initial_backlog`; those arrivals are logged in round 0. Use
    /// [`Ensemble::with_observers`] when a renderer must see them too.
    pub fn new(config: EnsembleConfig) -> Result<Self, SimulationError> {
        Self::with_observers(config, Vec::new())
    }

    /// Build an ensemble with renderers attached before pre-fill.
    ///
    /// Each observer receives every tier's descriptor, then the round-0
    /// arrivals that pre-fill produces, so it sees every item from creation.
    pub fn with_observers(
        config: EnsembleConfig,
        mut observers: Vec<Box<dyn TransitionObserver>>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let tiers = config
            .tiers
            .iter()
            .enumerate()
            .map(|(index, tc)| {
                Tier::new(TierId(index), tc.label.clone(), tc.layout.clone(), tc.overflow)
            })
            .collect();

        let mut ensemble = Self::assemble(config, tiers, RoundClock::new(), Uuid::new_v4());
        for observer in &mut observers {
            for tier in &ensemble.tiers {
                observer.tier_configured(&tier.descriptor());
            }
        }
        ensemble.observers = observers;
        ensemble.prefill()?;

        tracing::info!(
            run_id = %ensemble.run_id,
            tiers = ensemble.tiers.len(),
            observers = ensemble.observers.len(),
            seed = ensemble.config.rng_seed,
            "ensemble created"
        );
        Ok(ensemble)
    }

    fn assemble(config: EnsembleConfig, tiers: Vec<Tier>, clock: RoundClock, run_id: Uuid) -> Self {
        let arrivals =
            ArrivalGenerator::new(config.tiers.iter().map(|t| t.arrival.clone()).collect());
        let scenario = ScenarioHandler::new(config.scenario.clone());
        let rng = RngManager::new(config.rng_seed);
        Self {
            run_id,
            config,
            tiers,
            rng,
            clock,
            arrivals,
            scenario,
            event_log: EventLog::new(),
            observers: Vec::new(),
        }
    }

    fn prefill(&mut self) -> Result<(), SimulationError> {
        for index in 0..self.tiers.len() {
            let tier_config = &self.config.tiers[index];
            let tier = &self.tiers[index];
            let active = tier_config.initial_active.min(tier.active_capacity());
            let backlog = tier_config.initial_backlog.min(tier.backlog_visual_capacity());

            if active > 0 {
                self.enqueue(TierId(index), active, true)?;
            }
            if backlog > 0 {
                self.enqueue(TierId(index), backlog, false)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Observers
    // ========================================================================

    /// Attach a renderer; it immediately receives every tier's descriptor.
    ///
    /// Transitions that already happened, including pre-fill, are not
    /// replayed: the observer starts from the current state.
    pub fn attach_observer(&mut self, mut observer: Box<dyn TransitionObserver>) {
        for tier in &self.tiers {
            observer.tier_configured(&tier.descriptor());
        }
        self.observers.push(observer);
    }

    fn record(&mut self, tier: TierId, transitions: &[Transition]) {
        if transitions.is_empty() {
            return;
        }

        let round = self.clock.current_round();
        for transition in transitions {
            self.event_log.log(Event::from_transition(round, tier, transition));
        }
        for observer in &mut self.observers {
            observer.transitions(round, tier, transitions);
        }
    }

    // ========================================================================
    // Tier Operations
    // ========================================================================

    fn tier_mut(&mut self, tier: TierId) -> Result<&mut Tier, SimulationError> {
        self.tiers
            .get_mut(tier.0)
            .ok_or(SimulationError::TierNotFound(tier))
    }

    /// Create `count` items in `tier`; see [`Tier::enqueue`].
    ///
    /// A refused direct-to-active request is logged as
    /// [`Event::CapacityRejected`] and returned as an error so the caller can
    /// decide what to do with the overflow.
    pub fn enqueue(
        &mut self,
        tier: TierId,
        count: usize,
        direct_to_active: bool,
    ) -> Result<Vec<Transition>, SimulationError> {
        let outcome = self.tier_mut(tier)?.enqueue(count, direct_to_active);
        match outcome {
            Ok(transitions) => {
                self.record(tier, &transitions);
                Ok(transitions)
            }
            Err(TierError::CapacityExceeded {
                requested,
                available,
            }) => {
                self.event_log.log(Event::CapacityRejected {
                    round: self.clock.current_round(),
                    tier,
                    requested,
                    available,
                });
                Err(TierError::CapacityExceeded {
                    requested,
                    available,
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// One promotion-and-confirmation step on `tier`; see [`Tier::confirm_one`].
    pub fn confirm_one(&mut self, tier: TierId) -> Result<Vec<Transition>, SimulationError> {
        let index = tier.0;
        let target = self
            .tiers
            .get_mut(index)
            .ok_or(SimulationError::TierNotFound(tier))?;
        let transitions = target.confirm_one(&mut self.rng);
        self.record(tier, &transitions);
        Ok(transitions)
    }

    /// Repack `tier`'s backlog slots; see [`Tier::reflow_backlog`].
    pub fn reflow_backlog(&mut self, tier: TierId) -> Result<Vec<Transition>, SimulationError> {
        let transitions = self.tier_mut(tier)?.reflow_backlog();
        self.record(tier, &transitions);
        Ok(transitions)
    }

    /// Run one scripted action, returning every transition it produced.
    pub fn apply_action(
        &mut self,
        action: &ScriptedAction,
    ) -> Result<Vec<Transition>, SimulationError> {
        match action {
            ScriptedAction::Enqueue {
                tier,
                count,
                direct_to_active,
            } => self.enqueue(*tier, *count, *direct_to_active),
            ScriptedAction::Confirm { tier, times } => {
                let mut all = Vec::new();
                for _ in 0..*times {
                    all.extend(self.confirm_one(*tier)?);
                }
                Ok(all)
            }
            ScriptedAction::ReflowBacklog { tier } => self.reflow_backlog(*tier),
        }
    }

    // ========================================================================
    // Rounds
    // ========================================================================

    /// Execute one round.
    ///
    /// Capacity rejections (scripted or random) are counted in the result and
    /// the round carries on; any other error aborts it.
    #[tracing::instrument(skip(self), fields(run_id = %self.run_id, round = self.clock.current_round()))]
    pub fn run_round(&mut self) -> Result<RoundResult, SimulationError> {
        let round = self.clock.current_round();
        let mut tally = RoundTally::default();

        // STEP 1: SCRIPTED ACTIONS
        let actions: Vec<ScriptedAction> = self
            .scenario
            .actions_for_round(round)
            .into_iter()
            .cloned()
            .collect();
        for action in &actions {
            let outcome = self.apply_action(action);
            Self::tally_outcome(outcome, &mut tally)?;
        }

        // STEP 2: ARRIVALS
        for index in 0..self.tiers.len() {
            let tier = TierId(index);
            if let Some(batch) = self.arrivals.sample_for_tier(tier, &mut self.rng) {
                let outcome = self.enqueue(tier, batch.count, batch.direct_to_active);
                Self::tally_outcome(outcome, &mut tally)?;
            }
        }

        // STEP 3: CONFIRMATIONS
        for index in 0..self.tiers.len() {
            for _ in 0..self.config.tiers[index].confirmations_per_round {
                let transitions = self.confirm_one(TierId(index))?;
                tally.count(&transitions);
            }
        }

        // STEP 4: ROUND BOUNDARY
        let result = RoundResult {
            round,
            arrivals: tally.arrivals,
            confirmations: tally.confirmations,
            promotions: tally.promotions,
            rejections: tally.rejections,
            stats: self.stats(),
        };
        self.event_log.log(Event::RoundCompleted {
            round,
            arrivals: result.arrivals,
            confirmations: result.confirmations,
        });
        for observer in &mut self.observers {
            observer.round_completed(&result);
        }

        tracing::info!(
            arrivals = result.arrivals,
            confirmations = result.confirmations,
            rejections = result.rejections,
            "round completed"
        );

        // STEP 5: ADVANCE
        self.clock.advance_round();
        Ok(result)
    }

    fn tally_outcome(
        outcome: Result<Vec<Transition>, SimulationError>,
        tally: &mut RoundTally,
    ) -> Result<(), SimulationError> {
        match outcome {
            Ok(transitions) => tally.count(&transitions),
            Err(SimulationError::Tier(TierError::CapacityExceeded { .. })) => tally.rejections += 1,
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Execute `count` rounds.
    pub fn run_rounds(&mut self, count: usize) -> Result<Vec<RoundResult>, SimulationError> {
        (0..count).map(|_| self.run_round()).collect()
    }

    /// Run rounds until every one-time scripted action has fired.
    ///
    /// Does nothing for an empty scenario; errors if the scenario repeats
    /// forever.
    pub fn run_scenario(&mut self) -> Result<Vec<RoundResult>, SimulationError> {
        if self.scenario.is_empty() {
            return Ok(Vec::new());
        }
        let last = self.scenario.final_round().ok_or_else(|| {
            SimulationError::InvalidConfig("scenario has repeating actions and never ends".to_string())
        })?;

        let mut results = Vec::new();
        while self.clock.current_round() <= last {
            results.push(self.run_round()?);
        }
        Ok(results)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn current_round(&self) -> usize {
        self.clock.current_round()
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, tier: TierId) -> Result<&Tier, SimulationError> {
        self.tiers
            .get(tier.0)
            .ok_or(SimulationError::TierNotFound(tier))
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn rng_state(&self) -> u64 {
        self.rng.get_state()
    }

    pub fn stats(&self) -> Vec<TierStats> {
        self.tiers.iter().map(Tier::stats).collect()
    }

    /// Position of an active slot, failing fast past the tier's capacity.
    pub fn active_slot_position(
        &self,
        tier: TierId,
        index: usize,
    ) -> Result<Position, SimulationError> {
        Ok(self.tier(tier)?.layout().active_grid().slot_position(index)?)
    }

    /// Position of a backlog slot, failing fast past the visual capacity.
    pub fn backlog_slot_position(
        &self,
        tier: TierId,
        index: usize,
    ) -> Result<Position, SimulationError> {
        Ok(self.tier(tier)?.layout().backlog_grid().slot_position(index)?)
    }

    /// Check every tier's container invariants.
    pub fn check_invariants(&self) -> Result<(), SimulationError> {
        for tier in &self.tiers {
            tier.check_invariants()?;
        }
        Ok(())
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Capture the full state.
    pub fn snapshot(&self) -> Result<EnsembleSnapshot, SimulationError> {
        Ok(EnsembleSnapshot {
            run_id: self.run_id,
            current_round: self.clock.current_round(),
            rng_state: self.rng.get_state(),
            tiers: self.tiers.iter().map(TierSnapshot::from).collect(),
            config_hash: compute_config_hash(&self.config)?,
        })
    }

    /// Resume from a snapshot taken with the same config.
    ///
    /// The event log starts empty and no observers are attached.
    pub fn from_snapshot(
        config: EnsembleConfig,
        snapshot: &EnsembleSnapshot,
    ) -> Result<Self, SimulationError> {
        config.validate()?;
        validate_snapshot(snapshot, &config)?;

        let tiers = config
            .tiers
            .iter()
            .zip(&snapshot.tiers)
            .map(|(tc, ts)| {
                Tier::from_parts(
                    ts.id,
                    tc.label.clone(),
                    tc.layout.clone(),
                    tc.overflow,
                    ts.backlog.clone(),
                    &ts.active,
                    ts.confirmed.clone(),
                    ts.next_seq,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut ensemble = Self::assemble(
            config,
            tiers,
            RoundClock::at_round(snapshot.current_round),
            snapshot.run_id,
        );
        ensemble.rng = RngManager::new(snapshot.rng_state);

        tracing::info!(
            run_id = %ensemble.run_id,
            round = snapshot.current_round,
            "ensemble restored"
        );
        Ok(ensemble)
    }
}
