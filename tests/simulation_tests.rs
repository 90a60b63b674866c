//! End-to-end behaviour of the simulation engine.
//!
//! Covers the guarantees callers rely on:
//! - non-negative populations at every sample
//! - fixed-shape, strictly increasing time grid
//! - bit-for-bit determinism
//! - boundary cases (no infection, no immune response)
//! - clearance ordering with antibody strength

use std::sync::Arc;

use viral_immunity::{
    Constraint, EngineConfig, SimulationError, SimulationOutcome, SimulationRequest,
    SimulationService, SolverSettings,
};

fn service() -> SimulationService {
    SimulationService::new(Arc::new(EngineConfig::default())).expect("default config is valid")
}

fn run(request: SimulationRequest) -> SimulationOutcome {
    service().run(&request).expect("simulation should succeed")
}

fn no_immune_response() -> SimulationRequest {
    SimulationRequest {
        k_t: Some(0.0),
        k_a: Some(0.0),
        r: Some(0.0),
        s_t: Some(0.0),
        s_a: Some(0.0),
        ..Default::default()
    }
}

// ============================================================================
// Reference Scenario
// ============================================================================

#[test]
fn test_default_scenario() {
    let outcome = run(SimulationRequest {
        duration: Some(30.0),
        beta: Some(0.5),
        delta: Some(0.7),
        k_t: Some(0.5),
        k_a: Some(0.5),
        ..Default::default()
    });

    let traj = &outcome.trajectory;
    assert_eq!(traj.len(), 1000);
    assert_eq!(traj.times()[0], 0.0);
    assert_eq!(traj.last_time(), Some(30.0));

    let m = &outcome.metrics;
    assert!(m.peak_viral_load.is_finite() && m.peak_viral_load > 0.0);
    assert!(
        m.peak_viral_time > 0.0 && m.peak_viral_time < 30.0,
        "peak at t = {}",
        m.peak_viral_time
    );
    // Virus expands from V0 = 10 before the immune response catches up
    assert!(m.peak_viral_load > 10.0, "peak V = {}", m.peak_viral_load);

    if let Some(clearance) = m.clearance_time {
        assert!(clearance > m.peak_viral_time && clearance <= 30.0);
    }

    assert!(m.max_t_cells >= 20.0);
    assert!(m.peak_antibodies > 0.0);
    assert!(outcome.plausible);
}

#[test]
fn test_default_scenario_clears_within_horizon() {
    let outcome = run(SimulationRequest::default());
    let clearance = outcome.metrics.clearance_time.expect("default immune response clears");

    let traj = &outcome.trajectory;
    let index = traj.times().iter().position(|&t| t == clearance).unwrap();
    assert!(traj.states()[index].v <= 0.01 * outcome.metrics.peak_viral_load);
    assert!(traj.states()[index - 1].v > 0.01 * outcome.metrics.peak_viral_load);
}

// ============================================================================
// Invariants
// ============================================================================

#[test]
fn test_populations_never_negative() {
    let requests = [
        SimulationRequest::default(),
        no_immune_response(),
        SimulationRequest {
            k_a: Some(5.0),
            k_t: Some(2.0),
            ..Default::default()
        },
        SimulationRequest {
            c: Some(5.0),
            delta: Some(2.0),
            duration: Some(60.0),
            ..Default::default()
        },
    ];

    for request in requests {
        let outcome = run(request.clone());
        for (t, s) in outcome.trajectory.iter() {
            assert!(
                s.v >= 0.0 && s.i >= 0.0 && s.t >= 0.0 && s.a >= 0.0,
                "negative state {:?} at t = {} for {:?}",
                s,
                t,
                request
            );
        }
    }
}

#[test]
fn test_time_grid_shape() {
    for duration in [30.0, 7.5, 365.0] {
        let outcome = run(SimulationRequest {
            duration: Some(duration),
            ..Default::default()
        });
        let times = outcome.trajectory.times();

        assert_eq!(times.len(), 1000);
        assert_eq!(times[0], 0.0);
        assert_eq!(times[times.len() - 1], duration);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
    }
}

#[test]
fn test_configured_sample_count() {
    let mut config = EngineConfig::default();
    config.simulation.sample_points = 250;
    let service = SimulationService::new(Arc::new(config)).unwrap();

    let outcome = service.run(&SimulationRequest::default()).unwrap();
    assert_eq!(outcome.trajectory.len(), 250);
}

#[test]
fn test_runs_are_deterministic() {
    let request = SimulationRequest {
        beta: Some(0.8),
        k_a: Some(0.3),
        duration: Some(45.0),
        ..Default::default()
    };

    let first = service().run(&request).unwrap();
    let second = service().run(&request).unwrap();

    assert_eq!(first.trajectory, second.trajectory);
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_concurrent_runs_match_sequential() {
    let service = service();
    let requests: Vec<SimulationRequest> = [0.2, 0.5, 1.0, 2.0]
        .into_iter()
        .map(|k_a| SimulationRequest {
            k_a: Some(k_a),
            ..Default::default()
        })
        .collect();

    let sequential: Vec<SimulationOutcome> =
        requests.iter().map(|r| service.run(r).unwrap()).collect();

    let concurrent: Vec<SimulationOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|r| scope.spawn(|| service.run(r).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(sequential, concurrent);
}

// ============================================================================
// Boundary Cases
// ============================================================================

#[test]
fn test_zero_infection_stays_zero() {
    let outcome = run(SimulationRequest {
        v0: Some(0.0),
        i0: Some(0.0),
        ..Default::default()
    });

    for (t, s) in outcome.trajectory.iter() {
        assert_eq!(s.v, 0.0, "spontaneous virus at t = {}", t);
        assert_eq!(s.i, 0.0, "spontaneous infection at t = {}", t);
    }
    assert_eq!(outcome.metrics.peak_viral_load, 0.0);
    assert_eq!(outcome.metrics.clearance_time, None);

    // T cells decay without antigen
    let final_t = outcome.trajectory.final_state().unwrap().t;
    assert!(final_t < 20.0);
}

fn assert_infection_never_recedes(outcome: &SimulationOutcome) {
    let states = outcome.trajectory.states();
    for (k, w) in states.windows(2).enumerate() {
        assert!(w[1].v >= w[0].v, "viral load fell at sample {}: {} -> {}", k + 1, w[0].v, w[1].v);
        assert!(w[1].i >= w[0].i, "infected cells fell at sample {}: {} -> {}", k + 1, w[0].i, w[1].i);
    }
    assert_eq!(outcome.metrics.clearance_time, None);
    assert_eq!(outcome.metrics.peak_viral_time, outcome.trajectory.last_time().unwrap());
}

#[test]
fn test_no_immune_response_never_clears() {
    let outcome = run(no_immune_response());
    assert_infection_never_recedes(&outcome);
    assert_eq!(outcome.metrics.peak_viral_time, 30.0);
}

#[test]
fn test_no_immune_response_never_clears_at_tight_tolerance() {
    let mut config = EngineConfig::default();
    config.solver = SolverSettings {
        rel_tol: 1e-10,
        abs_tol: 1e-10,
        ..SolverSettings::default()
    };
    let service = SimulationService::new(Arc::new(config)).unwrap();
    let outcome = service.run(&no_immune_response()).unwrap();
    assert_infection_never_recedes(&outcome);
}

#[test]
fn test_clearance_not_delayed_by_stronger_neutralization() {
    let mut previous: Option<f64> = None;

    for k_a in [0.1, 0.5, 1.0, 2.0, 5.0] {
        let outcome = run(SimulationRequest {
            k_a: Some(k_a),
            ..Default::default()
        });
        let clearance = outcome
            .metrics
            .clearance_time
            .unwrap_or_else(|| panic!("k_a = {} should clear within 30 days", k_a));

        if let Some(prev) = previous {
            assert!(
                clearance <= prev,
                "k_a = {} cleared at {} after weaker neutralization cleared at {}",
                k_a,
                clearance,
                prev
            );
        }
        previous = Some(clearance);
    }
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_negative_duration_rejected() {
    let err = service().run_pairs([("duration", "-5")]).unwrap_err();
    assert_eq!(err.field(), Some("duration"));
    assert_eq!(err.kind(), "validation");
}

#[test]
fn test_zero_duration_rejected() {
    let err = service()
        .run(&SimulationRequest {
            duration: Some(0.0),
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(err.field(), Some("duration"));
    assert_eq!(err.kind(), "validation");

    let err = service().run_pairs([("duration", "0")]).unwrap_err();
    assert_eq!(err.field(), Some("duration"));
}

#[test]
fn test_negative_beta_rejected() {
    let err = service()
        .run(&SimulationRequest {
            beta: Some(-0.1),
            ..Default::default()
        })
        .unwrap_err();
    assert_eq!(
        err,
        SimulationError::Validation {
            field: "beta".into(),
            constraint: Constraint::NonNegative,
        }
    );
}

#[test]
fn test_unparseable_value_rejected() {
    let err = service().run_pairs([("k_t", "0.5x")]).unwrap_err();
    assert_eq!(err.field(), Some("k_t"));
}

#[test]
fn test_exhausted_step_budget_is_numerical_instability() {
    let mut config = EngineConfig::default();
    config.solver.max_steps_per_sample = 1;
    let service = SimulationService::new(Arc::new(config)).unwrap();

    match service.run(&SimulationRequest::default()) {
        Err(SimulationError::NumericalInstability {
            last_stable_time,
            partial,
            ..
        }) => {
            assert_eq!(last_stable_time, 0.0);
            assert_eq!(partial.len(), 1);
            assert_eq!(partial.last_time(), Some(0.0));
        }
        other => panic!("expected numerical instability, got {:?}", other),
    }
}

#[test]
fn test_solver_rejected_settings_fail_at_startup() {
    let mut config = EngineConfig::default();
    config.solver.initial_step = 1e-10;
    let err = SimulationService::new(Arc::new(config)).err().unwrap();
    assert_eq!(err.field(), Some("solver"));
    assert_eq!(err.kind(), "validation");
}
