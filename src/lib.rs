//! Within-host viral infection and immune response simulation.
//!
//! A four-compartment ODE model (free virus, infected cells, CD8+ T cells,
//! antibodies) is integrated with an adaptive Dormand-Prince solver and
//! summarized into peak, clearance and immune-marker metrics.
//!
//! ```no_run
//! use std::sync::Arc;
//! use viral_immunity::{EngineConfig, SimulationRequest, SimulationService};
//!
//! let service = SimulationService::new(Arc::new(EngineConfig::default()))?;
//! let outcome = service.run(&SimulationRequest {
//!     duration: Some(30.0),
//!     k_a: Some(1.0),
//!     ..Default::default()
//! })?;
//! println!("peak V = {}", outcome.metrics.peak_viral_load);
//! # Ok::<(), viral_immunity::SimulationError>(())
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod integrator;
pub mod metrics;
pub mod model;
pub mod params;
pub mod plot;
pub mod service;
pub mod state;

pub use config::{EngineConfig, InitialConditions, RateConstants, SolverSettings};
pub use error::{Constraint, ExportError, SimulationError};
pub use export::{SimulationResponse, TimeSeries};
pub use integrator::{Integrator, time_grid};
pub use metrics::{MetricsRecord, summarize};
pub use model::{CompartmentModel, ViralImmunityModel, derivative};
pub use params::{MIN_DURATION, ParameterSet, PlotMode, SimulationRequest};
pub use service::{SimulationOutcome, SimulationService};
pub use state::{StateVector, Trajectory};
