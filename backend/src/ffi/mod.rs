//! Python bindings (feature `pyo3`)
//!
//! Exposes [`crate::orchestrator::Ensemble`] as `Ensemble` so a Python
//! animation script can drive the simulator and read back transitions as
//! plain dicts.

pub mod ensemble;
pub mod types;
