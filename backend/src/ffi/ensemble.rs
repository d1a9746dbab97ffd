//! PyO3 wrapper for Ensemble

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{
    descriptor_to_py, round_result_to_py, stats_to_py, to_py_err, transitions_to_py,
};
use crate::models::TierId;
use crate::orchestrator::{Ensemble as RustEnsemble, EnsembleConfig, EnsembleSnapshot};

/// Python handle on a running ensemble
///
/// # Example (from Python)
///
/// ```python
/// from tiered_queue_sim_core import Ensemble
///
/// ens = Ensemble.reference()
/// for move in ens.enqueue(0, 30, True):
///     animate(move["item"], move["to_position"])
/// result = ens.run_round()
/// print(result["stats"][0]["active"])
/// ```
#[pyclass(name = "Ensemble", unsendable)]
pub struct PyEnsemble {
    inner: RustEnsemble,
}

#[pymethods]
impl PyEnsemble {
    /// Build from a JSON config string
    #[new]
    fn new(config_json: &str) -> PyResult<Self> {
        let config = EnsembleConfig::from_json(config_json).map_err(to_py_err)?;
        let inner = RustEnsemble::new(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[staticmethod]
    fn from_json(config_json: &str) -> PyResult<Self> {
        Self::new(config_json)
    }

    /// Three-tier scripted explainer
    #[staticmethod]
    fn reference() -> PyResult<Self> {
        let inner = RustEnsemble::new(EnsembleConfig::reference()).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Three tiers driven by random arrivals
    #[staticmethod]
    fn randomized(seed: u64) -> PyResult<Self> {
        let inner = RustEnsemble::new(EnsembleConfig::randomized(seed)).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Resume from `snapshot_json`, which must come from the same config
    #[staticmethod]
    fn restore(config_json: &str, snapshot_json: &str) -> PyResult<Self> {
        let config = EnsembleConfig::from_json(config_json).map_err(to_py_err)?;
        let snapshot = EnsembleSnapshot::from_json(snapshot_json).map_err(to_py_err)?;
        let inner = RustEnsemble::from_snapshot(config, &snapshot).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Create `count` items in `tier`; returns the list of moves
    #[pyo3(signature = (tier, count, direct_to_active=false))]
    fn enqueue<'py>(
        &mut self,
        py: Python<'py>,
        tier: usize,
        count: usize,
        direct_to_active: bool,
    ) -> PyResult<Bound<'py, PyList>> {
        let transitions = self
            .inner
            .enqueue(TierId(tier), count, direct_to_active)
            .map_err(to_py_err)?;
        transitions_to_py(py, &transitions)
    }

    /// One promotion-and-confirmation step; returns the list of moves
    fn confirm_one<'py>(&mut self, py: Python<'py>, tier: usize) -> PyResult<Bound<'py, PyList>> {
        let transitions = self.inner.confirm_one(TierId(tier)).map_err(to_py_err)?;
        transitions_to_py(py, &transitions)
    }

    fn reflow_backlog<'py>(
        &mut self,
        py: Python<'py>,
        tier: usize,
    ) -> PyResult<Bound<'py, PyList>> {
        let transitions = self.inner.reflow_backlog(TierId(tier)).map_err(to_py_err)?;
        transitions_to_py(py, &transitions)
    }

    fn run_round(&mut self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        let result = self.inner.run_round().map_err(to_py_err)?;
        round_result_to_py(py, &result)
    }

    fn current_round(&self) -> usize {
        self.inner.current_round()
    }

    /// Per-tier container sizes
    fn stats<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty_bound(py);
        for stats in self.inner.stats() {
            list.append(stats_to_py(py, &stats)?)?;
        }
        Ok(list)
    }

    /// Static tier geometry for the renderer
    fn descriptors<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyList>> {
        let list = PyList::empty_bound(py);
        for tier in self.inner.tiers() {
            list.append(descriptor_to_py(py, &tier.descriptor())?)?;
        }
        Ok(list)
    }

    /// `(x, y)` of active slot `index` in `tier`
    fn active_slot_position(&self, tier: usize, index: usize) -> PyResult<(f64, f64)> {
        let position = self
            .inner
            .active_slot_position(TierId(tier), index)
            .map_err(to_py_err)?;
        Ok((position.x, position.y))
    }

    fn snapshot_json(&self) -> PyResult<String> {
        self.inner
            .snapshot()
            .and_then(|s| s.to_json())
            .map_err(to_py_err)
    }
}
