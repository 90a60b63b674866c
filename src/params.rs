//! Caller-facing request and the validated parameter set built from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, InitialConditions, RateConstants};
use crate::error::{Constraint, SimulationError};
use crate::state::StateVector;

/// Presentation hint passed through to the caller untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotMode {
    #[default]
    Linear,
    Log,
    Phase,
}

impl PlotMode {
    pub const NAMES: &'static [&'static str] = &["linear", "log", "phase"];
    pub const ALL: [PlotMode; 3] = [PlotMode::Linear, PlotMode::Log, PlotMode::Phase];

    pub fn as_str(self) -> &'static str {
        match self {
            PlotMode::Linear => "linear",
            PlotMode::Log => "log",
            PlotMode::Phase => "phase",
        }
    }
}

impl fmt::Display for PlotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlotMode {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(PlotMode::Linear),
            "log" => Ok(PlotMode::Log),
            "phase" => Ok(PlotMode::Phase),
            _ => Err(SimulationError::validation(
                "plot_type",
                Constraint::OneOf(PlotMode::NAMES),
            )),
        }
    }
}

/// Raw simulation request; every field is optional and falls back to the
/// engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationRequest {
    pub duration: Option<f64>,
    pub plot_type: Option<String>,
    pub beta: Option<f64>,
    pub delta: Option<f64>,
    pub p: Option<f64>,
    pub c: Option<f64>,
    pub k_t: Option<f64>,
    pub k_a: Option<f64>,
    pub r: Option<f64>,
    pub theta: Option<f64>,
    pub s_t: Option<f64>,
    pub d_t: Option<f64>,
    pub s_a: Option<f64>,
    pub d_a: Option<f64>,
    #[serde(rename = "K")]
    pub carrying_capacity: Option<f64>,
    #[serde(rename = "V0")]
    pub v0: Option<f64>,
    #[serde(rename = "I0")]
    pub i0: Option<f64>,
    #[serde(rename = "T0")]
    pub t0: Option<f64>,
    #[serde(rename = "A0")]
    pub a0: Option<f64>,
}

impl SimulationRequest {
    /// Parse textual `(name, value)` pairs, as they arrive from a query string.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, SimulationError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::default();
        for (key, raw) in pairs {
            if key == "plot_type" {
                request.plot_type = Some(raw.to_string());
                continue;
            }
            let slot = request
                .numeric_slot(key)
                .ok_or_else(|| SimulationError::validation(key, Constraint::KnownField))?;
            let value = raw
                .trim()
                .parse::<f64>()
                .map_err(|_| SimulationError::validation(key, Constraint::Numeric(raw.to_string())))?;
            *slot = Some(value);
        }
        Ok(request)
    }

    fn numeric_slot(&mut self, key: &str) -> Option<&mut Option<f64>> {
        Some(match key {
            "duration" => &mut self.duration,
            "beta" => &mut self.beta,
            "delta" => &mut self.delta,
            "p" => &mut self.p,
            "c" => &mut self.c,
            "k_t" => &mut self.k_t,
            "k_a" => &mut self.k_a,
            "r" => &mut self.r,
            "theta" => &mut self.theta,
            "s_t" => &mut self.s_t,
            "d_t" => &mut self.d_t,
            "s_a" => &mut self.s_a,
            "d_a" => &mut self.d_a,
            "K" => &mut self.carrying_capacity,
            "V0" => &mut self.v0,
            "I0" => &mut self.i0,
            "T0" => &mut self.t0,
            "A0" => &mut self.a0,
            _ => return None,
        })
    }
}

/// Shortest accepted horizon (days); shorter spans collapse grid points
pub const MIN_DURATION: f64 = 1e-6;

/// Validated, immutable inputs of one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterSet {
    rates: RateConstants,
    initial: InitialConditions,
    duration: f64,
    plot_mode: PlotMode,
}

impl ParameterSet {
    /// Apply defaults from `config` and validate every field.
    ///
    /// Duration is checked first, then rate constants, carrying capacity,
    /// initial conditions and the plot hint.
    pub fn build(request: &SimulationRequest, config: &EngineConfig) -> Result<Self, SimulationError> {
        let duration = request.duration.unwrap_or(config.simulation.default_duration);
        finite("duration", duration)?;
        if duration <= 0.0 {
            return Err(SimulationError::validation("duration", Constraint::Positive));
        }
        if duration < MIN_DURATION {
            return Err(SimulationError::validation("duration", Constraint::AtLeast(MIN_DURATION)));
        }
        let max_duration = config.simulation.max_duration;
        if duration > max_duration {
            return Err(SimulationError::validation("duration", Constraint::AtMost(max_duration)));
        }

        let d = &config.model;
        let rates = RateConstants {
            beta: non_negative("beta", request.beta.unwrap_or(d.beta))?,
            delta: non_negative("delta", request.delta.unwrap_or(d.delta))?,
            p: non_negative("p", request.p.unwrap_or(d.p))?,
            c: non_negative("c", request.c.unwrap_or(d.c))?,
            k_t: non_negative("k_t", request.k_t.unwrap_or(d.k_t))?,
            k_a: non_negative("k_a", request.k_a.unwrap_or(d.k_a))?,
            r: non_negative("r", request.r.unwrap_or(d.r))?,
            theta: non_negative("theta", request.theta.unwrap_or(d.theta))?,
            s_t: non_negative("s_t", request.s_t.unwrap_or(d.s_t))?,
            d_t: non_negative("d_t", request.d_t.unwrap_or(d.d_t))?,
            s_a: non_negative("s_a", request.s_a.unwrap_or(d.s_a))?,
            d_a: non_negative("d_a", request.d_a.unwrap_or(d.d_a))?,
            carrying_capacity: positive(
                "K",
                request.carrying_capacity.unwrap_or(d.carrying_capacity),
            )?,
        };

        let ic = &config.initial_conditions;
        let initial = InitialConditions {
            v0: non_negative("V0", request.v0.unwrap_or(ic.v0))?,
            i0: non_negative("I0", request.i0.unwrap_or(ic.i0))?,
            t0: non_negative("T0", request.t0.unwrap_or(ic.t0))?,
            a0: non_negative("A0", request.a0.unwrap_or(ic.a0))?,
        };

        let plot_mode = match request.plot_type.as_deref() {
            Some(raw) => raw.parse()?,
            None => PlotMode::default(),
        };

        Ok(Self {
            rates,
            initial,
            duration,
            plot_mode,
        })
    }

    pub fn rates(&self) -> &RateConstants {
        &self.rates
    }

    pub fn initial_conditions(&self) -> &InitialConditions {
        &self.initial
    }

    pub fn initial_state(&self) -> StateVector {
        StateVector::new(self.initial.v0, self.initial.i0, self.initial.t0, self.initial.a0)
    }

    /// Simulated horizon in days
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn plot_mode(&self) -> PlotMode {
        self.plot_mode
    }

    /// Bit patterns of every numeric input, in a fixed order
    pub(crate) fn fingerprint(&self) -> [u64; 18] {
        let r = &self.rates;
        let ic = &self.initial;
        [
            self.duration, r.beta, r.delta, r.p, r.c, r.k_t, r.k_a, r.r, r.theta, r.s_t, r.d_t,
            r.s_a, r.d_a, r.carrying_capacity, ic.v0, ic.i0, ic.t0, ic.a0,
        ]
        .map(f64::to_bits)
    }
}

fn finite(field: &'static str, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::validation(field, Constraint::Finite))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, SimulationError> {
    if finite(field, value)? < 0.0 {
        return Err(SimulationError::validation(field, Constraint::NonNegative));
    }
    Ok(value)
}

fn positive(field: &'static str, value: f64) -> Result<f64, SimulationError> {
    if finite(field, value)? <= 0.0 {
        return Err(SimulationError::validation(field, Constraint::Positive));
    }
    Ok(value)
}
