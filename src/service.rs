//! Orchestration of a simulation run: validate, integrate, summarize.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::error::SimulationError;
use crate::integrator::{Integrator, time_grid};
use crate::metrics::{self, MetricsRecord};
use crate::model::ViralImmunityModel;
use crate::params::{ParameterSet, PlotMode, SimulationRequest};
use crate::state::Trajectory;

/// Successful result of one run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// Validated inputs the run used
    pub parameters: ParameterSet,
    pub trajectory: Trajectory,
    pub metrics: MetricsRecord,
    /// False when a sample exceeded the configured plausibility ceilings
    pub plausible: bool,
}

impl SimulationOutcome {
    pub fn plot_mode(&self) -> PlotMode {
        self.parameters.plot_mode()
    }
}

type CacheKey = ([u64; 18], usize);

/// Runs simulations against a shared, read-only configuration.
///
/// Runs are independent; the service can be shared across threads.
pub struct SimulationService {
    config: Arc<EngineConfig>,
    integrator: Integrator,
    cache: Option<Mutex<HashMap<CacheKey, SimulationOutcome>>>,
    cache_capacity: usize,
}

impl SimulationService {
    /// Create a service after checking the configuration is usable.
    pub fn new(config: Arc<EngineConfig>) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            integrator: Integrator::new(config.solver),
            config,
            cache: None,
            cache_capacity: 0,
        })
    }

    /// Memoize successful outcomes, keyed on the exact numeric inputs and
    /// grid size. The cache is emptied when it reaches `capacity`.
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = Some(Mutex::new(HashMap::with_capacity(capacity.min(1024))));
        self.cache_capacity = capacity.max(1);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `request` against the configured defaults and run it.
    pub fn run(&self, request: &SimulationRequest) -> Result<SimulationOutcome, SimulationError> {
        let params = ParameterSet::build(request, &self.config).inspect_err(|e| {
            log::debug!("Rejected simulation request: {}", e);
        })?;
        self.run_parameters(params)
    }

    /// Parse textual `(name, value)` pairs and run them.
    pub fn run_pairs<'a, I>(&self, pairs: I) -> Result<SimulationOutcome, SimulationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.run(&SimulationRequest::from_pairs(pairs)?)
    }

    /// Run an already validated parameter set.
    pub fn run_parameters(&self, params: ParameterSet) -> Result<SimulationOutcome, SimulationError> {
        let n = self.config.simulation.sample_points;
        let key = (params.fingerprint(), n);

        if let Some(hit) = self.cached(&key) {
            log::debug!("Simulation cache hit ({} days, {} samples)", params.duration(), n);
            return Ok(SimulationOutcome {
                parameters: params,
                ..hit
            });
        }

        log::debug!(
            "Running simulation: {} days, {} samples, plot mode {}",
            params.duration(),
            n,
            params.plot_mode()
        );

        let model = ViralImmunityModel::new(*params.rates());
        let grid = time_grid(params.duration(), n);
        let trajectory = self
            .integrator
            .integrate(&model, params.initial_state(), &grid)
            .inspect_err(|e| log::warn!("Simulation failed: {}", e))?;

        let metrics = metrics::summarize(&trajectory);
        let plausible = metrics::within_ceilings(&trajectory, &self.config.plausibility);
        if !plausible {
            log::warn!(
                "Trajectory exceeds plausibility ceilings (peak V = {:.3e}, max T = {:.3e})",
                metrics.peak_viral_load,
                metrics.max_t_cells
            );
        }

        let outcome = SimulationOutcome {
            parameters: params,
            trajectory,
            metrics,
            plausible,
        };
        self.store(key, &outcome);
        Ok(outcome)
    }

    fn cached(&self, key: &CacheKey) -> Option<SimulationOutcome> {
        self.cache.as_ref()?.lock().get(key).cloned()
    }

    fn store(&self, key: CacheKey, outcome: &SimulationOutcome) {
        let Some(cache) = &self.cache else {
            return;
        };
        let mut cache = cache.lock();
        if cache.len() >= self.cache_capacity {
            cache.clear();
        }
        cache.insert(key, outcome.clone());
    }

    /// Number of memoized outcomes
    pub fn cached_runs(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.lock().len())
    }
}
