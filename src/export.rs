//! Boundary-facing payloads and on-disk exports of finished runs.
//!
//! The JSON envelope mirrors what the web front end consumes: a `success`
//! flag, the aligned time series under `data`, and the scalar `metrics`.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{ExportError, SimulationError};
use crate::metrics::MetricsRecord;
use crate::params::{ParameterSet, PlotMode};
use crate::service::SimulationOutcome;
use crate::state::Trajectory;

/// Column-oriented trajectory, every series aligned to `time`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub time: Vec<f64>,
    pub viral_load: Vec<f64>,
    pub infected_cells: Vec<f64>,
    pub t_cells: Vec<f64>,
    pub antibodies: Vec<f64>,
}

impl From<&Trajectory> for TimeSeries {
    fn from(traj: &Trajectory) -> Self {
        Self {
            time: traj.times().to_vec(),
            viral_load: traj.viral_load(),
            infected_cells: traj.infected_cells(),
            t_cells: traj.t_cells(),
            antibodies: traj.antibodies(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub data: TimeSeries,
    pub metrics: MetricsRecord,
    pub plot_type: PlotMode,
    pub plausible: bool,
}

/// Samples computed before a numerical failure; never a complete result
#[derive(Debug, Clone, Serialize)]
pub struct PartialResult {
    pub incomplete: bool,
    pub last_stable_time: f64,
    pub data: TimeSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialResult>,
}

/// JSON envelope for either outcome of a run
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SimulationResponse {
    Success(SuccessResponse),
    Failure(FailureResponse),
}

impl From<&SimulationOutcome> for SimulationResponse {
    fn from(outcome: &SimulationOutcome) -> Self {
        SimulationResponse::Success(SuccessResponse {
            success: true,
            data: TimeSeries::from(&outcome.trajectory),
            metrics: outcome.metrics,
            plot_type: outcome.plot_mode(),
            plausible: outcome.plausible,
        })
    }
}

impl From<&SimulationError> for SimulationResponse {
    fn from(err: &SimulationError) -> Self {
        let partial = match err {
            SimulationError::NumericalInstability {
                last_stable_time,
                partial,
                ..
            } => Some(PartialResult {
                incomplete: true,
                last_stable_time: *last_stable_time,
                data: TimeSeries::from(partial.as_ref()),
            }),
            _ => None,
        };
        SimulationResponse::Failure(FailureResponse {
            success: false,
            error: err.to_string(),
            kind: err.kind(),
            field: err.field().map(str::to_string),
            partial,
        })
    }
}

impl From<&Result<SimulationOutcome, SimulationError>> for SimulationResponse {
    fn from(result: &Result<SimulationOutcome, SimulationError>) -> Self {
        match result {
            Ok(outcome) => outcome.into(),
            Err(err) => err.into(),
        }
    }
}

impl SimulationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResponse::Success(_))
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Row of the downloadable results table
#[derive(Debug, Clone, Serialize)]
struct ResultRow {
    #[serde(rename = "Time")]
    time: f64,
    #[serde(rename = "Viral_Load")]
    viral_load: f64,
    #[serde(rename = "Infected_Cells")]
    infected_cells: f64,
    #[serde(rename = "T_Cells")]
    t_cells: f64,
    #[serde(rename = "Antibodies")]
    antibodies: f64,
}

/// Write the trajectory as CSV with a header row
pub fn write_csv<W: Write>(trajectory: &Trajectory, writer: W) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    for (time, s) in trajectory.iter() {
        csv.serialize(ResultRow {
            time,
            viral_load: s.v,
            infected_cells: s.i,
            t_cells: s.t,
            antibodies: s.a,
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the trajectory to a CSV file
pub fn save_csv<P: AsRef<Path>>(trajectory: &Trajectory, path: P) -> Result<PathBuf, ExportError> {
    let path = path.as_ref().to_path_buf();
    write_csv(trajectory, File::create(&path)?)?;
    log::info!("CSV results exported: {}", path.display());
    Ok(path)
}

#[derive(Serialize)]
struct SavedRun<'a> {
    parameters: &'a ParameterSet,
    data: TimeSeries,
    metrics: &'a MetricsRecord,
    plausible: bool,
}

/// Files written by [`save_run`]
#[derive(Debug, Clone)]
pub struct SavedFiles {
    pub results: PathBuf,
    pub config: PathBuf,
}

/// Save `simulation_results.json` and `config.json` under `dir`, creating it
/// if needed
pub fn save_run<P: AsRef<Path>>(
    outcome: &SimulationOutcome,
    config: &EngineConfig,
    dir: P,
) -> Result<SavedFiles, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let results = dir.join("simulation_results.json");
    let saved = SavedRun {
        parameters: &outcome.parameters,
        data: TimeSeries::from(&outcome.trajectory),
        metrics: &outcome.metrics,
        plausible: outcome.plausible,
    };
    serde_json::to_writer_pretty(File::create(&results)?, &saved)?;

    let config_path = dir.join("config.json");
    serde_json::to_writer_pretty(File::create(&config_path)?, config)?;

    log::info!("Results saved to {}", dir.display());
    Ok(SavedFiles {
        results,
        config: config_path,
    })
}
