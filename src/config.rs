//! Process-wide engine configuration.
//!
//! Default rate constants follow the literature-tuned values of the reference
//! viral immunity model. The configuration is built once at start-up and
//! shared read-only between runs.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Constraint, SimulationError};
use crate::integrator;

/// Top-level configuration container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Default rate constants and carrying capacity
    pub model: RateConstants,
    /// Default initial state
    pub initial_conditions: InitialConditions,
    /// Time horizon and sampling
    pub simulation: SimulationSettings,
    /// Adaptive solver controls
    pub solver: SolverSettings,
    /// Soft ceilings used to flag implausible trajectories
    pub plausibility: PlausibilityCeilings,
}

impl EngineConfig {
    /// Load configuration from a JSON file, or use defaults if the file is
    /// missing or malformed
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded engine configuration from {:?}", path.as_ref());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse engine configuration: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Engine configuration file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let s = &self.simulation;
        if s.sample_points < 2 {
            return Err(SimulationError::validation(
                "simulation.sample_points",
                Constraint::AtLeast(2.0),
            ));
        }
        if !(s.max_duration.is_finite() && s.max_duration > 0.0) {
            return Err(SimulationError::validation(
                "simulation.max_duration",
                Constraint::Positive,
            ));
        }
        if !(s.default_duration > 0.0 && s.default_duration <= s.max_duration) {
            return Err(SimulationError::validation(
                "simulation.default_duration",
                Constraint::AtMost(s.max_duration),
            ));
        }

        let solver = &self.solver;
        for (field, value) in [
            ("solver.rel_tol", solver.rel_tol),
            ("solver.abs_tol", solver.abs_tol),
            ("solver.initial_step", solver.initial_step),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimulationError::validation(field, Constraint::Positive));
            }
        }
        if solver.max_steps_per_sample == 0 {
            return Err(SimulationError::validation(
                "solver.max_steps_per_sample",
                Constraint::AtLeast(1.0),
            ));
        }
        integrator::check_settings(solver)
            .map_err(|reason| SimulationError::validation("solver", Constraint::SolverRejected(reason)))
    }
}

/// Biological rate constants (units: day⁻¹ unless noted)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConstants {
    /// Infection rate
    pub beta: f64,
    /// Infected cell death rate
    pub delta: f64,
    /// Virion production per infected cell
    pub p: f64,
    /// Free virus clearance
    pub c: f64,
    /// T-cell killing rate
    pub k_t: f64,
    /// Antibody neutralization rate
    pub k_a: f64,
    /// T-cell proliferation
    pub r: f64,
    /// Half-saturation of T-cell proliferation (cells)
    pub theta: f64,
    /// T-cell stimulation by infected cells
    pub s_t: f64,
    /// T-cell decay
    pub d_t: f64,
    /// Antibody production
    pub s_a: f64,
    /// Antibody decay
    pub d_a: f64,
    /// Carrying capacity of infected cells
    #[serde(rename = "K")]
    pub carrying_capacity: f64,
}

impl Default for RateConstants {
    fn default() -> Self {
        Self {
            // Exposed to callers
            beta: 0.5,
            delta: 0.7,
            k_t: 0.5,
            k_a: 0.5,

            // Internal
            p: 40.0,
            c: 0.1,
            r: 2.5,
            theta: 50.0,
            s_t: 1.5,
            d_t: 0.02,
            s_a: 0.8,
            d_a: 0.01,
            carrying_capacity: 1.0e3,
        }
    }
}

/// Default initial state of the four compartments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    #[serde(rename = "V0")]
    pub v0: f64,
    #[serde(rename = "I0")]
    pub i0: f64,
    #[serde(rename = "T0")]
    pub t0: f64,
    #[serde(rename = "A0")]
    pub a0: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            v0: 10.0,
            i0: 1.0,
            t0: 20.0,
            a0: 0.0,
        }
    }
}

/// Time horizon and output sampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Duration used when the caller does not supply one (days)
    pub default_duration: f64,
    /// Upper bound on requested durations (days)
    pub max_duration: f64,
    /// Number of reported samples spanning [0, duration]
    pub sample_points: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            default_duration: 30.0,
            max_duration: 365.0,
            sample_points: 1000,
        }
    }
}

/// Adaptive Dormand-Prince controls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub rel_tol: f64,
    pub abs_tol: f64,
    /// First trial step of every sample interval (days), at least 1e-8.
    ///
    /// There is no configurable floor: a step at or below
    /// `10 * f64::EPSILON` ends the run as numerically unstable.
    pub initial_step: f64,
    /// Step budget for a single sample interval
    pub max_steps_per_sample: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            rel_tol: 1e-6,
            abs_tol: 1e-6,
            initial_step: 1e-4,
            max_steps_per_sample: 100_000,
        }
    }
}

/// Values above these are biologically implausible for the default units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlausibilityCeilings {
    pub viral_load: f64,
    pub infected_cells: f64,
    pub t_cells: f64,
    pub antibodies: f64,
}

impl Default for PlausibilityCeilings {
    fn default() -> Self {
        Self {
            viral_load: 1e8,
            infected_cells: 1e6,
            t_cells: 1e5,
            antibodies: 1e4,
        }
    }
}
