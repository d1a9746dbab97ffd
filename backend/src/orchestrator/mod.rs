//! Orchestrator - round loop over the tier ensemble
//!
//! See `engine.rs` for the round sequence, `checkpoint.rs` for save/restore
//! and `observer.rs` for the renderer-facing contract.

pub mod checkpoint;
pub mod engine;
pub mod observer;

// Re-export main types for convenience
pub use engine::{Ensemble, EnsembleConfig, RoundResult, SimulationError, TierConfig};

pub use checkpoint::{compute_config_hash, EnsembleSnapshot, TierSnapshot};
pub use observer::{RecordingObserver, TransitionBatch, TransitionObserver};
