//! Chi-squared objective shared by the optimizers.

use crate::domain::{ModelKind, Observation};
use crate::math::chi_squared_with;
use crate::models::predict;

/// Outcome of one unconstrained minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub fun: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// `false` when the iteration cap stopped the search.
    pub converged: bool,
}

/// Chi-squared of `model` over `obs` as a function of the parameter vector.
///
/// Parameter values for which the model is undefined (NaN/inf predictions)
/// evaluate to `+∞`, so every optimizer moves away from them.
pub fn chi_squared_objective(model: ModelKind, obs: &[Observation]) -> impl Fn(&[f64]) -> f64 + '_ {
    move |params: &[f64]| {
        let value = chi_squared_with(obs, |x| predict(model, x, params));
        if value.is_finite() { value } else { f64::INFINITY }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_model_region_is_infinitely_bad() {
        // A 2.5 Å barrier averages to ~0.35 eV, so 0.9 eV electrons are above it.
        let obs = [Observation::new(0.9, 0.5, 0.01)];
        let f = chi_squared_objective(ModelKind::Tunnelling, &obs);
        assert_eq!(f(&[2.5]), f64::INFINITY);
    }

    #[test]
    fn objective_is_zero_at_generating_parameters() {
        let params = [5.0e-4, 5.0e-3];
        let obs: Vec<Observation> = [120.0, 900.0, 2400.0]
            .iter()
            .map(|&t| Observation::new(t, predict(ModelKind::Decay, t, &params), 1e11))
            .collect();
        let f = chi_squared_objective(ModelKind::Decay, &obs);
        assert_eq!(f(&params), 0.0);
        assert!(f(&[5.5e-4, 5.0e-3]) > 0.0);
    }
}
