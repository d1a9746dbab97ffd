//! Scripted action types
//!
//! # Design Principles
//!
//! 1. **Determinism**: actions run in the order they are listed
//! 2. **Self-contained**: an action names its tier and all its parameters
//! 3. **Logged**: whatever an action moves shows up in the event log

use crate::models::TierId;
use serde::{Deserialize, Serialize};

/// One caller-issued tier operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptedAction {
    /// `Tier::enqueue(count, direct_to_active)`
    Enqueue {
        tier: TierId,
        count: usize,
        #[serde(default)]
        direct_to_active: bool,
    },

    /// `Tier::confirm_one()` repeated `times` times
    Confirm {
        tier: TierId,
        #[serde(default = "one")]
        times: usize,
    },

    /// `Tier::reflow_backlog()`
    ReflowBacklog { tier: TierId },
}

fn one() -> usize {
    1
}

impl ScriptedAction {
    pub fn tier(&self) -> TierId {
        match self {
            ScriptedAction::Enqueue { tier, .. }
            | ScriptedAction::Confirm { tier, .. }
            | ScriptedAction::ReflowBacklog { tier } => *tier,
        }
    }
}

/// When to run a scripted action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionSchedule {
    /// Once, in the given round
    OneTime { round: usize },

    /// Every `interval` rounds starting at `start_round`
    Repeating { start_round: usize, interval: usize },
}

impl ActionSchedule {
    /// Check if this schedule fires in the given round
    pub fn should_execute(&self, round: usize) -> bool {
        match self {
            ActionSchedule::OneTime { round: scheduled } => round == *scheduled,
            ActionSchedule::Repeating {
                start_round,
                interval,
            } => *interval > 0 && round >= *start_round && (round - start_round) % interval == 0,
        }
    }
}

/// A scripted action paired with its schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub action: ScriptedAction,
    pub schedule: ActionSchedule,
}

impl ScheduledAction {
    pub fn once(round: usize, action: ScriptedAction) -> Self {
        Self {
            action,
            schedule: ActionSchedule::OneTime { round },
        }
    }
}

/// The ten-round, three-tier walkthrough the multi-queue explainer plays.
///
/// Tier 0 is filled to exactly its 60-slot active capacity and then fed
/// through its backlog; tiers 1 and 2 receive single direct arrivals that are
/// confirmed in the following round.
pub fn reference_scenario() -> Vec<ScheduledAction> {
    let enqueue = |tier: usize, count: usize, direct_to_active: bool| ScriptedAction::Enqueue {
        tier: TierId(tier),
        count,
        direct_to_active,
    };
    let confirm = |tier: usize| ScriptedAction::Confirm {
        tier: TierId(tier),
        times: 1,
    };

    let rounds: Vec<Vec<ScriptedAction>> = vec![
        vec![enqueue(0, 30, true)],
        vec![confirm(0)],
        vec![enqueue(0, 31, true), enqueue(0, 5, false)],
        vec![confirm(0)],
        vec![enqueue(0, 30, false), enqueue(1, 1, true), enqueue(2, 1, true)],
        vec![enqueue(0, 5, false), confirm(0), confirm(1), confirm(2)],
        vec![enqueue(0, 5, false), enqueue(1, 1, true), enqueue(2, 1, true)],
        vec![enqueue(0, 3, false), confirm(0), confirm(1), confirm(2)],
        vec![enqueue(0, 5, false), enqueue(2, 1, true)],
        vec![confirm(0), confirm(2)],
    ];

    rounds
        .into_iter()
        .enumerate()
        .flat_map(|(round, actions)| {
            actions
                .into_iter()
                .map(move |action| ScheduledAction::once(round, action))
        })
        .collect()
}
