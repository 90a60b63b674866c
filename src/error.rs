//! Error types for simulation runs and result export.

use std::fmt;

use thiserror::Error;

use crate::state::Trajectory;

/// Rule a rejected input value violated.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Must be strictly greater than zero
    Positive,
    /// Must be zero or greater
    NonNegative,
    /// Must not exceed the given bound
    AtMost(f64),
    /// Must be at least the given bound
    AtLeast(f64),
    /// Must be a finite number
    Finite,
    /// Text that could not be parsed as a number
    Numeric(String),
    /// Must be one of the listed values
    OneOf(&'static [&'static str]),
    /// Field name is not recognised
    KnownField,
    /// The ODE solver refused the setting
    SolverRejected(&'static str),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Positive => write!(f, "must be > 0"),
            Constraint::NonNegative => write!(f, "must be >= 0"),
            Constraint::AtMost(max) => write!(f, "must be <= {max}"),
            Constraint::AtLeast(min) => write!(f, "must be >= {min}"),
            Constraint::Finite => write!(f, "must be a finite number"),
            Constraint::Numeric(raw) => write!(f, "'{raw}' is not a number"),
            Constraint::OneOf(allowed) => write!(f, "must be one of {}", allowed.join(", ")),
            Constraint::KnownField => write!(f, "unknown parameter"),
            Constraint::SolverRejected(reason) => write!(f, "rejected by the solver ({reason})"),
        }
    }
}

/// Terminal failure of a simulation run.
///
/// None of these are retried: integration is deterministic, so identical
/// inputs always reproduce the same failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Malformed or out-of-range input, detected before integration starts
    #[error("invalid `{field}`: {constraint}")]
    Validation { field: String, constraint: Constraint },

    /// The solver ran out of steps, or its step size collapsed to
    /// `10 * f64::EPSILON`, before reaching the next sample.
    ///
    /// `partial` holds the samples up to `last_stable_time` and is incomplete.
    #[error("numerical instability after t = {last_stable_time}: {reason}")]
    NumericalInstability {
        last_stable_time: f64,
        reason: String,
        partial: Box<Trajectory>,
    },

    /// Unexpected arithmetic fault such as NaN propagation
    #[error("internal computation error: {0}")]
    InternalComputation(String),
}

impl SimulationError {
    /// Creates a validation error for `field`.
    pub fn validation(field: impl Into<String>, constraint: Constraint) -> Self {
        SimulationError::Validation {
            field: field.into(),
            constraint,
        }
    }

    /// Field name of a validation error.
    pub fn field(&self) -> Option<&str> {
        match self {
            SimulationError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Short machine-readable category, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            SimulationError::Validation { .. } => "validation",
            SimulationError::NumericalInstability { .. } => "numerical_instability",
            SimulationError::InternalComputation(_) => "internal",
        }
    }
}

/// Failure while writing results to disk or rendering plots.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("plot error: {0}")]
    Plot(String),
}
