//! Reporting utilities: residuals, derived quantities and terminal output.

pub mod format;

pub use format::*;

use crate::domain::{DerivedQuantity, FitResult, ModelKind, Observation, ObservationResidual};
use crate::error::AppError;
use crate::models::{decay, predict_observations, tunnelling};

/// Compute fitted values, residuals and pulls for each observation.
pub fn compute_residuals(
    obs: &[Observation],
    model: ModelKind,
    params: &[f64],
) -> Result<Vec<ObservationResidual>, AppError> {
    let fitted = predict_observations(model, obs, params);
    if fitted.iter().any(|y| !y.is_finite()) {
        return Err(AppError::numeric(
            "Non-finite model prediction during residual computation.",
        ));
    }
    Ok(obs
        .iter()
        .zip(fitted)
        .map(|(o, y_fit)| {
            let residual = o.y - y_fit;
            ObservationResidual {
                obs: *o,
                y_fit,
                residual,
                pull: residual / o.sigma,
            }
        })
        .collect())
}

/// Physical quantities that follow from the fitted parameters.
///
/// - tunnelling: number of BN layers
/// - decay: Rb-79 and Sr-79 half-lives in minutes
pub fn derived_quantities(fit: &FitResult) -> Vec<DerivedQuantity> {
    match fit.model {
        ModelKind::Tunnelling => {
            let d = fit.params[0];
            vec![DerivedQuantity {
                name: "layers".to_string(),
                value: tunnelling::layer_count(d),
                error: finite(tunnelling::layer_count(fit.errors[0])),
                unit: String::new(),
            }]
        }
        ModelKind::Decay => ["rb_half_life", "sr_half_life"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let (lambda, err) = (fit.params[i], fit.errors[i]);
                DerivedQuantity {
                    name: name.to_string(),
                    value: decay::half_life(lambda) / decay::SECONDS_PER_MINUTE,
                    error: finite(decay::half_life_error(lambda, err) / decay::SECONDS_PER_MINUTE),
                    unit: "min".to_string(),
                }
            })
            .collect(),
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
