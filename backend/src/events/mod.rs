//! Scripted scenarios
//!
//! A scenario is a list of tier actions, each scheduled for one or more
//! rounds. The ensemble runs the actions due in a round before any random
//! arrivals or automatic confirmations.

pub mod handler;
pub mod types;

pub use handler::ScenarioHandler;
pub use types::{reference_scenario, ActionSchedule, ScheduledAction, ScriptedAction};
