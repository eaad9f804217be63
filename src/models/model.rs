//! Model dispatch for the fitted models.
//!
//! The fitter relies on two primitive operations:
//! - predict `y(x)` for one observation (objective evaluation)
//! - predict over a whole observation set (residuals, plots)
//!
//! Both are defined here for each model kind.

use crate::domain::{ModelKind, Observation};
use crate::models::{decay, tunnelling};

/// Predict `y(x)` for the given model kind.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`. Callers size the
/// parameter vector from the model kind.
pub fn predict(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    match model {
        ModelKind::Tunnelling => tunnelling::transmission(x, params[0]),
        ModelKind::Decay => decay::activity(x, params[0], params[1]),
    }
}

/// Elementwise [`predict`] over a slice of independent-variable values.
pub fn predict_all(model: ModelKind, xs: &[f64], params: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| predict(model, x, params)).collect()
}

/// Predictions at the `x` of every observation, in order.
pub fn predict_observations(model: ModelKind, obs: &[Observation], params: &[f64]) -> Vec<f64> {
    obs.iter().map(|o| predict(model, o.x, params)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_all_matches_scalar_predict() {
        let cases: [(ModelKind, Vec<f64>, Vec<f64>); 2] = [
            (ModelKind::Tunnelling, vec![4.0], vec![0.0, 0.05, 0.1, 0.2, 0.3]),
            (
                ModelKind::Decay,
                vec![5.0e-4, 5.0e-3],
                vec![60.0, 600.0, 1800.0, 3600.0, 7200.0],
            ),
        ];

        for (model, params, xs) in cases {
            let batch = predict_all(model, &xs, &params);
            assert_eq!(batch.len(), xs.len());
            for (x, y) in xs.iter().zip(batch.iter()) {
                let scalar = predict(model, *x, &params);
                assert_eq!(scalar.to_bits(), y.to_bits(), "{model:?} at x={x}");
            }
        }
    }

    #[test]
    fn predict_observations_uses_x_column() {
        let obs = [Observation::new(0.1, 0.5, 0.01), Observation::new(0.2, 0.4, 0.01)];
        let fitted = predict_observations(ModelKind::Tunnelling, &obs, &[4.0]);
        assert_eq!(fitted, predict_all(ModelKind::Tunnelling, &[0.1, 0.2], &[4.0]));
    }
}
