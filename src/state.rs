//! State vector and sampled trajectory of the four-compartment model.

use serde::{Deserialize, Serialize};

/// Instantaneous state `(V, I, T, A)`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StateVector {
    /// Free virus
    pub v: f64,
    /// Infected cells
    pub i: f64,
    /// CD8+ T cells
    pub t: f64,
    /// Antibodies
    pub a: f64,
}

impl StateVector {
    /// Number of compartments
    pub const NDIM: usize = 4;

    pub fn new(v: f64, i: f64, t: f64, a: f64) -> Self {
        Self { v, i, t, a }
    }

    pub fn from_slice(y: &[f64]) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.v, self.i, self.t, self.a]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|x| x.is_finite())
    }

    /// Floor every component at zero.
    ///
    /// Callers must check `is_finite` first: `f64::max` maps NaN to 0.
    pub fn clamp_non_negative(self) -> Self {
        Self::new(self.v.max(0.0), self.i.max(0.0), self.t.max(0.0), self.a.max(0.0))
    }

    /// Name of the first non-finite component, if any
    pub fn first_non_finite(&self) -> Option<&'static str> {
        ["V", "I", "T", "A"]
            .into_iter()
            .zip(self.to_array())
            .find(|(_, x)| !x.is_finite())
            .map(|(name, _)| name)
    }
}

/// Samples `(t, state)` on a strictly increasing time grid
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<StateVector>,
}

impl Trajectory {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            times: Vec::with_capacity(n),
            states: Vec::with_capacity(n),
        }
    }

    /// Append a sample. Time must increase strictly.
    pub(crate) fn push(&mut self, time: f64, state: StateVector) {
        debug_assert!(self.times.last().is_none_or(|&last| time > last));
        self.times.push(time);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &StateVector)> + '_ {
        self.times.iter().copied().zip(self.states.iter())
    }

    /// Time of the last stored sample
    pub fn last_time(&self) -> Option<f64> {
        self.times.last().copied()
    }

    pub fn final_state(&self) -> Option<&StateVector> {
        self.states.last()
    }

    pub fn viral_load(&self) -> Vec<f64> {
        self.column(|s| s.v)
    }

    pub fn infected_cells(&self) -> Vec<f64> {
        self.column(|s| s.i)
    }

    pub fn t_cells(&self) -> Vec<f64> {
        self.column(|s| s.t)
    }

    pub fn antibodies(&self) -> Vec<f64> {
        self.column(|s| s.a)
    }

    fn column(&self, f: impl Fn(&StateVector) -> f64) -> Vec<f64> {
        self.states.iter().map(f).collect()
    }
}
