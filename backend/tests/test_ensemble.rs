//! Ensemble Integration Tests
//!
//! Round loop, observer delivery and ensemble-level error handling.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use tiered_queue_sim_core::arrivals::{ArrivalConfig, ArrivalDistribution};
use tiered_queue_sim_core::core::grid::GridError;
use tiered_queue_sim_core::events::{ActionSchedule, ScheduledAction, ScriptedAction};
use tiered_queue_sim_core::models::{
    Container, Event, ItemId, OverflowPolicy, TierError, TierId, TierLayout,
};
use tiered_queue_sim_core::orchestrator::{
    Ensemble, EnsembleConfig, RecordingObserver, SimulationError, TierConfig, TransitionObserver,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn single_tier(tier: TierConfig) -> EnsembleConfig {
    EnsembleConfig {
        rng_seed: 42,
        tiers: vec![tier],
        scenario: vec![],
    }
}

fn fixed_arrivals(count: usize, direct_to_active: bool) -> Option<ArrivalConfig> {
    Some(ArrivalConfig {
        distribution: ArrivalDistribution::Fixed { count },
        direct_to_active,
    })
}

fn scripted_only() -> EnsembleConfig {
    let mut config = EnsembleConfig::reference();
    config.scenario.clear();
    config
}

// ============================================================================
// Round loop
// ============================================================================

#[test]
fn test_round_counter_starts_at_zero() {
    let mut ensemble = Ensemble::new(scripted_only()).unwrap();
    assert_eq!(ensemble.current_round(), 0);

    let result = ensemble.run_round().unwrap();
    assert_eq!(result.round, 0);
    assert_eq!(ensemble.current_round(), 1);
}

#[test]
fn test_fixed_direct_arrivals_fill_active_set() {
    let mut tier = TierConfig::new("busy", TierLayout::default());
    tier.arrival = fixed_arrivals(3, true);
    tier.confirmations_per_round = 1;

    let mut ensemble = Ensemble::new(single_tier(tier)).unwrap();
    let results = ensemble.run_rounds(5).unwrap();

    for result in &results {
        assert_eq!(result.arrivals, 3);
        assert_eq!(result.confirmations, 1);
        assert_eq!(result.rejections, 0);
    }
    let stats = &results[4].stats[0];
    assert_eq!(stats.active_len, 10);
    assert_eq!(stats.confirmed_len, 5);
    assert_eq!(stats.total_enqueued, 15);
}

#[test]
fn test_backlog_arrivals_pass_through_empty_active_set() {
    let mut tier = TierConfig::new("trickle", TierLayout::default());
    tier.arrival = fixed_arrivals(2, false);
    tier.confirmations_per_round = 1;

    let mut ensemble = Ensemble::new(single_tier(tier)).unwrap();
    let result = ensemble.run_round().unwrap();

    assert_eq!(result.arrivals, 2);
    assert_eq!(result.promotions, 1);
    assert_eq!(result.confirmations, 1);
    assert_eq!(result.stats[0].backlog_len, 1);
    assert_eq!(result.stats[0].active_len, 0);
}

#[test]
fn test_random_rejections_do_not_abort_round() {
    let mut tier = TierConfig::new("overfull", TierLayout::default());
    tier.arrival = fixed_arrivals(61, true);
    tier.overflow = OverflowPolicy::Reject;

    let mut ensemble = Ensemble::new(single_tier(tier)).unwrap();
    let results = ensemble.run_rounds(3).unwrap();

    assert!(results.iter().all(|r| r.rejections == 1 && r.arrivals == 0));
    assert_eq!(
        ensemble.event_log().events_of_type("CapacityRejected").len(),
        3
    );
    assert_eq!(ensemble.current_round(), 3);
}

#[test]
fn test_direct_enqueue_reports_rejection() {
    let mut ensemble = Ensemble::new(scripted_only()).unwrap();
    ensemble.enqueue(TierId(2), 60, true).unwrap();

    let err = ensemble.enqueue(TierId(2), 1, true).unwrap_err();
    assert_eq!(
        err,
        SimulationError::Tier(TierError::CapacityExceeded {
            requested: 1,
            available: 0
        })
    );
    assert_eq!(ensemble.tier(TierId(2)).unwrap().total_enqueued(), 60);
}

#[test]
fn test_redirect_marks_overflow() {
    let mut config = scripted_only();
    config.tiers[1].overflow = OverflowPolicy::Redirect;
    let mut ensemble = Ensemble::new(config).unwrap();

    let transitions = ensemble.enqueue(TierId(1), 62, true).unwrap();
    let redirected: Vec<_> = transitions.iter().filter(|t| t.redirected).collect();
    assert_eq!(redirected.len(), 2);
    assert!(redirected.iter().all(|t| t.to == Container::Backlog));
    assert_eq!(ensemble.event_log().events_of_type("Redirected").len(), 2);
}

#[test]
fn test_repeating_schedule_fires_every_interval() {
    let mut config = scripted_only();
    config.scenario = vec![ScheduledAction {
        action: ScriptedAction::Enqueue {
            tier: TierId(0),
            count: 2,
            direct_to_active: false,
        },
        schedule: ActionSchedule::Repeating {
            start_round: 1,
            interval: 3,
        },
    }];
    let mut ensemble = Ensemble::new(config).unwrap();
    let results = ensemble.run_rounds(8).unwrap();

    let arrivals: Vec<usize> = results.iter().map(|r| r.arrivals).collect();
    assert_eq!(arrivals, vec![0, 2, 0, 0, 2, 0, 0, 2]);
}

#[test]
fn test_repeating_scenario_cannot_run_to_completion() {
    let mut config = scripted_only();
    config.scenario = vec![ScheduledAction {
        action: ScriptedAction::Confirm {
            tier: TierId(0),
            times: 1,
        },
        schedule: ActionSchedule::Repeating {
            start_round: 0,
            interval: 1,
        },
    }];
    let mut ensemble = Ensemble::new(config).unwrap();
    assert!(matches!(
        ensemble.run_scenario(),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_reflow_action() {
    let mut ensemble = Ensemble::new(scripted_only()).unwrap();
    ensemble.enqueue(TierId(0), 60, true).unwrap();
    ensemble.enqueue(TierId(0), 4, false).unwrap();
    ensemble.confirm_one(TierId(0)).unwrap();

    let moves = ensemble
        .apply_action(&ScriptedAction::ReflowBacklog { tier: TierId(0) })
        .unwrap();
    assert_eq!(moves.len(), 3);
    assert_eq!(ensemble.event_log().events_of_type("Reflow").len(), 3);
}

// ============================================================================
// Observers
// ============================================================================

#[test]
fn test_observer_sees_everything_in_order() {
    let recorder = Rc::new(RefCell::new(RecordingObserver::new()));
    let mut config = EnsembleConfig::reference();
    config.tiers[0].initial_backlog = 2;

    let observers: Vec<Box<dyn TransitionObserver>> = vec![Box::new(recorder.clone())];
    let mut ensemble = Ensemble::with_observers(config, observers).unwrap();
    ensemble.run_scenario().unwrap();

    let recorder = recorder.borrow();
    assert_eq!(recorder.descriptors.len(), 3);
    assert_eq!(recorder.descriptors[0].label, "<0.000001X");
    assert_eq!(recorder.descriptors[0].active_capacity(), 60);
    assert_eq!(recorder.rounds.len(), 10);

    let observed = recorder.all_transitions().count();
    let logged = ensemble
        .event_log()
        .events()
        .iter()
        .filter(|e| e.item().is_some())
        .count();
    assert_eq!(observed, logged);

    assert!(recorder
        .batches
        .windows(2)
        .all(|pair| pair[0].round <= pair[1].round));
}

#[test]
fn test_observer_sees_prefilled_items_arrive() {
    let recorder = Rc::new(RefCell::new(RecordingObserver::new()));
    let mut config = EnsembleConfig::randomized(7);
    config.tiers[0].initial_backlog = 10;
    config.tiers[0].initial_active = 5;

    let observers: Vec<Box<dyn TransitionObserver>> = vec![Box::new(recorder.clone())];
    let mut ensemble = Ensemble::with_observers(config, observers).unwrap();
    ensemble.run_rounds(3).unwrap();

    let recorder = recorder.borrow();
    assert_eq!(recorder.descriptors.len(), 3);

    let top = ensemble.tier(TierId(0)).unwrap();
    let arrived: HashSet<ItemId> = recorder
        .batches
        .iter()
        .filter(|batch| batch.tier == TierId(0))
        .flat_map(|batch| batch.transitions.iter())
        .filter(|t| t.from == Container::Arrival)
        .map(|t| t.item)
        .collect();
    assert_eq!(arrived.len() as u64, top.total_enqueued());
    assert!(top.total_enqueued() >= 15);
    assert!(top.confirmed().iter().all(|item| arrived.contains(item)));

    // Pre-fill lands in round 0, ahead of the first confirmation
    let first = &recorder.batches[0];
    assert_eq!(first.round, 0);
    assert!(first.transitions.iter().all(|t| t.from == Container::Arrival));
}

#[test]
fn test_late_observer_starts_from_current_state() {
    let recorder = Rc::new(RefCell::new(RecordingObserver::new()));
    let mut config = EnsembleConfig::reference();
    config.tiers[0].initial_backlog = 2;

    let mut ensemble = Ensemble::new(config).unwrap();
    ensemble.attach_observer(Box::new(recorder.clone()));
    assert_eq!(recorder.borrow().descriptors.len(), 3);
    assert!(recorder.borrow().batches.is_empty());

    ensemble.run_round().unwrap();
    assert_eq!(recorder.borrow().rounds.len(), 1);
}

#[test]
fn test_round_completed_event_closes_each_round() {
    let mut ensemble = Ensemble::new(EnsembleConfig::reference()).unwrap();
    ensemble.run_scenario().unwrap();

    for round in 0..10 {
        let events = ensemble.event_log().events_in_round(round);
        assert!(matches!(
            events.last(),
            Some(Event::RoundCompleted { round: r, .. }) if *r == round
        ));
    }
}

// ============================================================================
// Errors and queries
// ============================================================================

#[test]
fn test_unknown_tier() {
    let mut ensemble = Ensemble::new(scripted_only()).unwrap();
    assert_eq!(
        ensemble.enqueue(TierId(9), 1, false).unwrap_err(),
        SimulationError::TierNotFound(TierId(9))
    );
    assert!(ensemble.tier(TierId(3)).is_err());
    assert!(ensemble.reflow_backlog(TierId(3)).is_err());
}

#[test]
fn test_slot_position_past_capacity_fails() {
    let ensemble = Ensemble::new(scripted_only()).unwrap();
    assert!(ensemble.active_slot_position(TierId(0), 59).is_ok());
    assert_eq!(
        ensemble.active_slot_position(TierId(0), 60).unwrap_err(),
        SimulationError::Grid(GridError::IndexOutOfRange {
            index: 60,
            capacity: 60
        })
    );
    assert!(ensemble.backlog_slot_position(TierId(0), 123).is_ok());
    assert!(ensemble.backlog_slot_position(TierId(0), 124).is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "rng_seed": 3,
        "tiers": [
            {
                "label": "only",
                "overflow": "redirect",
                "arrival": {"distribution": {"type": "poisson", "rate_per_round": 2.0}},
                "confirmations_per_round": 2
            }
        ],
        "scenario": [
            {"action": {"type": "enqueue", "tier": 0, "count": 5}, "schedule": {"round": 0}}
        ]
    }"#;
    let config = EnsembleConfig::from_json(json).unwrap();
    assert_eq!(config.tiers[0].layout, TierLayout::default());
    assert_eq!(config.tiers[0].overflow, OverflowPolicy::Redirect);

    let mut ensemble = Ensemble::new(config).unwrap();
    ensemble.run_rounds(10).unwrap();
    ensemble.check_invariants().unwrap();
}

#[test]
fn test_invalid_arrival_probability_rejected() {
    let mut tier = TierConfig::new("bad", TierLayout::default());
    tier.arrival = Some(ArrivalConfig::bernoulli(1.5, false));
    assert!(matches!(
        Ensemble::new(single_tier(tier)),
        Err(SimulationError::InvalidConfig(_))
    ));
}
