//! Summary metrics derived from a completed trajectory.

use serde::{Deserialize, Serialize};

use crate::config::PlausibilityCeilings;
use crate::state::Trajectory;

/// Viral load must fall to this fraction of its peak to count as cleared
pub const CLEARANCE_FRACTION: f64 = 0.01;

/// Scalar summary of one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Maximum viral load over the horizon
    pub peak_viral_load: f64,
    /// Time of the first sample reaching the peak (days)
    pub peak_viral_time: f64,
    /// First post-peak time with V ≤ 1% of peak; `None` if not reached
    pub clearance_time: Option<f64>,
    /// Maximum T-cell count
    pub max_t_cells: f64,
    /// Maximum antibody level
    pub peak_antibodies: f64,
}

impl MetricsRecord {
    pub fn is_cleared(&self) -> bool {
        self.clearance_time.is_some()
    }
}

/// Compute every metric in a single pass.
///
/// The clearance candidate is reset whenever a new peak appears, so only
/// samples after the final peak can clear. A trajectory whose peak is zero
/// never established an infection and reports no clearance. An empty
/// trajectory yields zeros.
pub fn summarize(trajectory: &Trajectory) -> MetricsRecord {
    let mut peak_viral_load = 0.0_f64;
    let mut peak_viral_time = trajectory.times().first().copied().unwrap_or(0.0);
    let mut clearance_time = None;
    let mut max_t_cells = 0.0_f64;
    let mut peak_antibodies = 0.0_f64;

    for (index, (t, state)) in trajectory.iter().enumerate() {
        if index == 0 || state.v > peak_viral_load {
            peak_viral_load = state.v;
            peak_viral_time = t;
            clearance_time = None;
        } else if clearance_time.is_none()
            && peak_viral_load > 0.0
            && state.v <= CLEARANCE_FRACTION * peak_viral_load
        {
            clearance_time = Some(t);
        }

        max_t_cells = max_t_cells.max(state.t);
        peak_antibodies = peak_antibodies.max(state.a);
    }

    MetricsRecord {
        peak_viral_load,
        peak_viral_time,
        clearance_time,
        max_t_cells,
        peak_antibodies,
    }
}

/// Whether every sample stays within the configured ceilings
pub fn within_ceilings(trajectory: &Trajectory, ceilings: &PlausibilityCeilings) -> bool {
    trajectory.states().iter().all(|s| {
        s.v <= ceilings.viral_load
            && s.i <= ceilings.infected_cells
            && s.t <= ceilings.t_cells
            && s.a <= ceilings.antibodies
    })
}
