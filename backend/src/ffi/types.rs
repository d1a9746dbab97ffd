//! Rust → Python conversions
//!
//! Everything crosses the boundary as dicts of primitives; no Rust types leak
//! into Python.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::models::{Container, TierDescriptor, TierStats, Transition};
use crate::orchestrator::{RoundResult, SimulationError};

/// Map a simulation error onto a Python exception.
///
/// Bad input (config, unknown tier, capacity) is a `ValueError`; anything else
/// is a `RuntimeError`.
pub fn to_py_err(err: SimulationError) -> PyErr {
    match err {
        SimulationError::InvalidConfig(_)
        | SimulationError::TierNotFound(_)
        | SimulationError::Tier(_)
        | SimulationError::Grid(_) => {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(err.to_string())
        }
        _ => PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(err.to_string()),
    }
}

fn container_name(container: Container) -> &'static str {
    match container {
        Container::Arrival => "arrival",
        Container::Backlog => "backlog",
        Container::Active => "active",
        Container::Confirmed => "confirmed",
    }
}

/// Convert one transition to a dict
///
/// Keys: `item`, `from`, `from_slot`, `to`, `to_slot`, `to_position` (an
/// `(x, y)` tuple or `None`), `redirected`.
pub fn transition_to_py<'py>(
    py: Python<'py>,
    transition: &Transition,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("item", transition.item.to_string())?;
    dict.set_item("from", container_name(transition.from))?;
    dict.set_item("from_slot", transition.from_slot)?;
    dict.set_item("to", container_name(transition.to))?;
    dict.set_item("to_slot", transition.to_slot)?;
    dict.set_item("to_position", transition.to_position.map(|p| (p.x, p.y)))?;
    dict.set_item("redirected", transition.redirected)?;
    Ok(dict)
}

pub fn transitions_to_py<'py>(
    py: Python<'py>,
    transitions: &[Transition],
) -> PyResult<Bound<'py, PyList>> {
    let list = PyList::empty_bound(py);
    for transition in transitions {
        list.append(transition_to_py(py, transition)?)?;
    }
    Ok(list)
}

pub fn stats_to_py<'py>(py: Python<'py>, stats: &TierStats) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("tier", stats.id.0)?;
    dict.set_item("label", &stats.label)?;
    dict.set_item("backlog", stats.backlog_len)?;
    dict.set_item("active", stats.active_len)?;
    dict.set_item("confirmed", stats.confirmed_len)?;
    dict.set_item("total_enqueued", stats.total_enqueued)?;
    dict.set_item("active_capacity", stats.active_capacity)?;
    Ok(dict)
}

pub fn descriptor_to_py<'py>(
    py: Python<'py>,
    descriptor: &TierDescriptor,
) -> PyResult<Bound<'py, PyDict>> {
    let layout = &descriptor.layout;
    let dict = PyDict::new_bound(py);
    dict.set_item("tier", descriptor.id.0)?;
    dict.set_item("label", &descriptor.label)?;
    dict.set_item("center", (layout.center_x, layout.center_y))?;
    dict.set_item("height", layout.height)?;
    dict.set_item("backlog_width", layout.backlog_width)?;
    dict.set_item("active_width", layout.active_width)?;
    dict.set_item("spacing", layout.spacing)?;
    dict.set_item(
        "active_grid",
        (descriptor.active_dims.columns, descriptor.active_dims.rows),
    )?;
    dict.set_item(
        "backlog_grid",
        (descriptor.backlog_dims.columns, descriptor.backlog_dims.rows),
    )?;
    Ok(dict)
}

/// Convert a round result to a dict
///
/// Keys: `round`, `arrivals`, `confirmations`, `promotions`, `rejections`,
/// `stats` (list of per-tier dicts).
pub fn round_result_to_py(py: Python<'_>, result: &RoundResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("round", result.round)?;
    dict.set_item("arrivals", result.arrivals)?;
    dict.set_item("confirmations", result.confirmations)?;
    dict.set_item("promotions", result.promotions)?;
    dict.set_item("rejections", result.rejections)?;

    let stats = PyList::empty_bound(py);
    for tier in &result.stats {
        stats.append(stats_to_py(py, tier)?)?;
    }
    dict.set_item("stats", stats)?;

    Ok(dict.unbind())
}
