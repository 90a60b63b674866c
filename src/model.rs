//! Right-hand side of the viral infection / immune response system.
//!
//! ```text
//! dV/dt = p·I − c·V − k_a·A·V
//! dI/dt = β·V·(1 − I/K) − δ·I − k_t·T·I
//! dT/dt = r·T·I/(θ + I) + s_t·I·T/(100 + I) − d_t·T
//! dA/dt = s_a·V·T/(100 + V) + 0.1·I − d_a·A
//! ```
//!
//! Saturating terms `x/(h + x)` are zero whenever `x` is not positive, so a
//! state with no infection never evaluates `0/0`.

use crate::config::RateConstants;
use crate::state::StateVector;

/// Half-saturation of the secondary T-cell and antibody stimulation terms
pub const STIMULATION_HALF_SATURATION: f64 = 100.0;

/// Antibody production per infected cell, independent of T-cell help
pub const INFECTED_CELL_ANTIBODY_DRIVE: f64 = 0.1;

/// A system of ODEs over the four compartments
pub trait CompartmentModel {
    /// Evaluate `d(state)/dt`
    fn derivative(&self, state: &StateVector, t: f64) -> StateVector;
}

/// The four-compartment viral immunity model with fixed rate constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViralImmunityModel {
    rates: RateConstants,
}

impl ViralImmunityModel {
    pub fn new(rates: RateConstants) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RateConstants {
        &self.rates
    }
}

impl CompartmentModel for ViralImmunityModel {
    fn derivative(&self, state: &StateVector, t: f64) -> StateVector {
        derivative(state, t, &self.rates)
    }
}

/// `x / (half + x)` for positive `x`, zero otherwise
#[inline]
fn saturation(x: f64, half: f64) -> f64 {
    if x > 0.0 { x / (half + x) } else { 0.0 }
}

/// Instantaneous rates of change. The system is autonomous; `_t` is unused.
pub fn derivative(state: &StateVector, _t: f64, k: &RateConstants) -> StateVector {
    let StateVector { v, i, t, a } = *state;

    let dv = k.p * i - k.c * v - k.k_a * a * v;

    let di = k.beta * v * (1.0 - i / k.carrying_capacity) - k.delta * i - k.k_t * t * i;

    // Proliferation and stimulation both vanish without infected cells
    let dt = k.r * t * saturation(i, k.theta) + k.s_t * t * saturation(i, STIMULATION_HALF_SATURATION)
        - k.d_t * t;

    let da = k.s_a * t * saturation(v, STIMULATION_HALF_SATURATION) + INFECTED_CELL_ANTIBODY_DRIVE * i
        - k.d_a * a;

    StateVector::new(dv, di, dt, da)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_derivative_at_default_initial_state() {
        let rates = RateConstants::default();
        let d = derivative(&StateVector::new(10.0, 1.0, 20.0, 0.0), 0.0, &rates);

        assert_close(d.v, 39.0);
        assert_close(d.i, 0.5 * 10.0 * (1.0 - 1.0 / 1000.0) - 0.7 - 10.0);
        assert_close(d.t, 2.5 * 20.0 / 51.0 + 1.5 * 20.0 / 101.0 - 0.4);
        assert_close(d.a, 0.8 * 10.0 * 20.0 / 110.0 + 0.1);
    }

    #[test]
    fn test_no_infection_is_a_fixed_point_for_virus() {
        let rates = RateConstants::default();
        let d = derivative(&StateVector::new(0.0, 0.0, 20.0, 5.0), 3.0, &rates);

        assert_eq!(d.v, 0.0);
        assert_eq!(d.i, 0.0);
        assert_close(d.t, -rates.d_t * 20.0);
        assert_close(d.a, -rates.d_a * 5.0);
    }

    #[test]
    fn test_zero_half_saturation_does_not_produce_nan() {
        let rates = RateConstants {
            theta: 0.0,
            ..RateConstants::default()
        };
        let d = derivative(&StateVector::new(0.0, 0.0, 1.0, 0.0), 0.0, &rates);
        assert!(d.is_finite());

        let d = derivative(&StateVector::new(1.0, 1e-300, 1.0, 0.0), 0.0, &rates);
        assert!(d.is_finite());
    }

    #[test]
    fn test_negative_excursion_disables_saturating_terms() {
        let rates = RateConstants::default();
        let d = derivative(&StateVector::new(-1e-8, -1e-8, 10.0, 0.0), 0.0, &rates);
        assert_close(d.t, -rates.d_t * 10.0);
    }

    #[test]
    fn test_time_invariance() {
        let model = ViralImmunityModel::new(RateConstants::default());
        let state = StateVector::new(3.0, 0.5, 25.0, 1.0);
        assert_eq!(model.derivative(&state, 0.0), model.derivative(&state, 17.0));
    }
}
