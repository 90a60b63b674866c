//! Adaptive ODE integration sampled on a fixed time grid.
//!
//! The Dormand-Prince 5(4) pair from `russell_ode` advances the state one
//! sample interval at a time, subdividing each interval internally as the
//! error control demands. Only the grid points are reported.
//!
//! After every sample the state is floored at zero and integration resumes
//! from the floored state, so discretization error never carries a negative
//! population forward.

use russell_lab::{StrError, Vector};
use russell_ode::{Method, OdeSolver, Params, System};

use crate::config::SolverSettings;
use crate::error::SimulationError;
use crate::model::CompartmentModel;
use crate::state::{StateVector, Trajectory};

const NON_FINITE_DERIVATIVE: StrError = "non-finite derivative";

/// Evenly spaced grid of `n` points over `[0, duration]`, ending exactly at
/// `duration`
pub fn time_grid(duration: f64, n: usize) -> Vec<f64> {
    let last = n.saturating_sub(1).max(1) as f64;
    let mut grid: Vec<f64> = (0..n).map(|k| duration * k as f64 / last).collect();
    if let Some(end) = grid.last_mut() {
        *end = duration;
    }
    grid
}

/// Collects what happened inside the right-hand side during a solve
#[derive(Debug, Default)]
struct RhsStats {
    evaluations: u64,
    non_finite: Option<(f64, &'static str)>,
}

/// Explicit adaptive integrator
#[derive(Debug, Clone)]
pub struct Integrator {
    settings: SolverSettings,
}

impl Integrator {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Integrate `model` from `initial` and report the state at every point of
    /// `grid`, which must start at the initial time and increase strictly.
    ///
    /// # Errors
    ///
    /// - `NumericalInstability` when the solver exhausts its step budget or its
    ///   step size collapses to the fixed floor of `10 * f64::EPSILON`; carries
    ///   the samples computed so far.
    /// - `InternalComputation` on a non-finite derivative or state, or a
    ///   malformed grid.
    pub fn integrate<M>(
        &self,
        model: &M,
        initial: StateVector,
        grid: &[f64],
    ) -> Result<Trajectory, SimulationError>
    where
        M: CompartmentModel + Clone + Send + Sync + 'static,
    {
        if grid.is_empty() {
            return Err(SimulationError::InternalComputation("empty time grid".into()));
        }
        if grid.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SimulationError::InternalComputation(
                "time grid is not strictly increasing".into(),
            ));
        }
        if let Some(name) = initial.first_non_finite() {
            return Err(SimulationError::InternalComputation(format!(
                "non-finite initial {name}"
            )));
        }

        let rhs = model.clone();
        let system = System::new(
            StateVector::NDIM,
            move |dydt: &mut Vector, t: f64, y: &Vector, stats: &mut RhsStats| {
                stats.evaluations += 1;
                let d = rhs.derivative(&StateVector::new(y[0], y[1], y[2], y[3]), t);
                if let Some(name) = d.first_non_finite() {
                    stats.non_finite = Some((t, name));
                    return Err(NON_FINITE_DERIVATIVE);
                }
                dydt[0] = d.v;
                dydt[1] = d.i;
                dydt[2] = d.t;
                dydt[3] = d.a;
                Ok(())
            },
        );

        let params = solver_params(&self.settings).map_err(solver_setup)?;
        let mut solver = OdeSolver::new(params, system).map_err(solver_setup)?;

        let mut stats = RhsStats::default();
        let start = initial.clamp_non_negative();
        let mut y = Vector::from(&start.to_array());
        let mut trajectory = Trajectory::with_capacity(grid.len());
        trajectory.push(grid[0], start);

        for window in grid.windows(2) {
            let (t0, t1) = (window[0], window[1]);

            if let Err(reason) = solver.solve(&mut y, t0, t1, None, &mut stats, None) {
                if let Some((t, name)) = stats.non_finite {
                    log::error!("Non-finite d{}/dt at t = {} (after sample t = {})", name, t, t0);
                    return Err(SimulationError::InternalComputation(format!(
                        "non-finite d{name}/dt at t = {t}"
                    )));
                }
                // An accepted step that overflowed is left in `y`
                let reached = StateVector::new(y[0], y[1], y[2], y[3]);
                if let Some(name) = reached.first_non_finite() {
                    log::error!("Non-finite {} between t = {} and t = {}", name, t0, t1);
                    return Err(SimulationError::InternalComputation(format!(
                        "non-finite {name} after t = {t0}"
                    )));
                }
                log::debug!("Solver stalled between t = {} and t = {}: {}", t0, t1, reason);
                return Err(SimulationError::NumericalInstability {
                    last_stable_time: t0,
                    reason: reason.to_string(),
                    partial: Box::new(trajectory),
                });
            }

            // The solver rejects non-finite states itself, so `y` is finite here
            let state = StateVector::new(y[0], y[1], y[2], y[3]).clamp_non_negative();
            for (k, x) in state.to_array().into_iter().enumerate() {
                y[k] = x;
            }
            trajectory.push(t1, state);
        }

        log::debug!(
            "Integrated {} samples over [{}, {}] with {} right-hand side evaluations",
            trajectory.len(),
            grid[0],
            grid[grid.len() - 1],
            stats.evaluations
        );
        Ok(trajectory)
    }
}

/// Dormand-Prince parameters for `settings`
fn solver_params(settings: &SolverSettings) -> Result<Params, StrError> {
    let mut params = Params::new(Method::DoPri5);
    params.step.h_ini = settings.initial_step;
    params.step.n_step_max = settings.max_steps_per_sample;
    params.set_tolerances(settings.abs_tol, settings.rel_tol, None)?;
    Ok(params)
}

/// Check that the solver accepts `settings`, without integrating anything
pub(crate) fn check_settings(settings: &SolverSettings) -> Result<(), StrError> {
    let system = System::new(
        StateVector::NDIM,
        |_: &mut Vector, _: f64, _: &Vector, _: &mut ()| Ok(()),
    );
    OdeSolver::new(solver_params(settings)?, system).map(|_| ())
}

fn solver_setup(reason: StrError) -> SimulationError {
    SimulationError::InternalComputation(format!("solver setup failed: {reason}"))
}
