//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm. Every random decision in the simulator
//! (uniform eviction from an active set, arrival gating) draws from here so
//! a seed fully determines a run.

mod xorshift;

pub use xorshift::RngManager;
