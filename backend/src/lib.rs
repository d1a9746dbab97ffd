//! Tiered Queue Simulator Core
//!
//! Deterministic model of a priority-tiered admission queue: items wait in a
//! backlog, get promoted into a fixed-capacity active set, and are confirmed
//! one at a time by uniform random choice. Every state change is reported as
//! a [`models::Transition`] carrying the slot and coordinates a renderer
//! needs to animate it.
//!
//! # Architecture
//!
//! - **core**: Grid geometry and the round clock
//! - **models**: Domain types (Tier, ActiveSet, ItemId, Transition, Event)
//! - **arrivals**: Per-tier random arrival sampling
//! - **events**: Scripted scenarios
//! - **orchestrator**: Ensemble of tiers, round loop, checkpoints, observers
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. An item is in exactly one of backlog, active set, confirmed log
//! 2. The active set never holds more items than its grid capacity
//! 3. All randomness is deterministic (seeded RNG)
//! 4. The simulator never draws; renderers consume transitions

// Module declarations
pub mod arrivals;
pub mod core;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod rng;

// Re-exports for convenience
pub use arrivals::{ArrivalConfig, ArrivalDistribution};
pub use crate::core::grid::{
    capacity, slot_position, FillOrder, Grid, GridDimensions, GridError, Position, RegionBounds,
};
pub use crate::core::round::RoundClock;
pub use models::{
    ActiveSet, Container, Event, EventLog, ItemId, OverflowPolicy, Tier, TierError, TierId,
    TierLayout, Transition,
};
pub use orchestrator::{
    Ensemble, EnsembleConfig, EnsembleSnapshot, RoundResult, SimulationError, TierConfig,
    TransitionObserver,
};
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn tiered_queue_sim_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::ensemble::PyEnsemble>()?;
    Ok(())
}
