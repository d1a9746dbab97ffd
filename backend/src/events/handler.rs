//! Scenario scheduling
//!
//! Looks up which scripted actions are due in a round. Execution lives on the
//! ensemble, which owns the tiers the actions touch.

use crate::events::types::{ActionSchedule, ScheduledAction, ScriptedAction};

/// Holds a scenario and answers "what runs this round?"
#[derive(Debug, Clone, Default)]
pub struct ScenarioHandler {
    actions: Vec<ScheduledAction>,
}

impl ScenarioHandler {
    pub fn new(actions: Vec<ScheduledAction>) -> Self {
        Self { actions }
    }

    /// Actions due in `round`, in scenario order
    pub fn actions_for_round(&self, round: usize) -> Vec<&ScriptedAction> {
        self.actions
            .iter()
            .filter(|scheduled| scheduled.schedule.should_execute(round))
            .map(|scheduled| &scheduled.action)
            .collect()
    }

    /// Last round with a one-time action, or `None` if the scenario is empty
    /// or repeats forever.
    pub fn final_round(&self) -> Option<usize> {
        let mut last = None;
        for scheduled in &self.actions {
            match scheduled.schedule {
                ActionSchedule::OneTime { round } => {
                    last = Some(last.map_or(round, |l: usize| l.max(round)));
                }
                ActionSchedule::Repeating { .. } => return None,
            }
        }
        last
    }

    pub fn actions(&self) -> &[ScheduledAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
