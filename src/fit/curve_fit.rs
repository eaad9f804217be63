//! Weighted Levenberg–Marquardt least squares and parameter covariance.
//!
//! Residuals are normalized by the measurement uncertainty:
//!
//! ```text
//! r_i(p) = (y_i - f(x_i; p)) / σ_i
//! ```
//!
//! so `Σ r_i²` is exactly the chi-squared objective. The covariance is
//! `(JᵀJ)⁻¹` evaluated at the optimum, with `J` the Jacobian of the normalized
//! residuals. `σ_i` is taken as absolute (no rescaling by the reduced
//! chi-squared).

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{ModelKind, Observation};
use crate::error::AppError;
use crate::math::{covariance_from_jacobian, solve_least_squares, standard_errors};
use crate::models::predict;

/// Relative finite-difference step (√ε for f64).
const FD_RELATIVE_STEP: f64 = 1.490_116_119_384_765_6e-8;

const DAMPING_UP: f64 = 10.0;
const DAMPING_DOWN: f64 = 0.1;
const MAX_DAMPING: f64 = 1e16;

#[derive(Debug, Clone)]
pub struct CurveFitOptions {
    pub max_iterations: usize,
    /// Relative step size below which the iteration stops.
    pub x_tol: f64,
    /// Relative chi-squared reduction below which the iteration stops.
    pub f_tol: f64,
    pub initial_damping: f64,
}

impl Default for CurveFitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            x_tol: 1.49e-8,
            f_tol: 1.49e-8,
            initial_damping: 1e-3,
        }
    }
}

/// Converged least-squares fit with its covariance.
#[derive(Debug, Clone)]
pub struct CurveFit {
    pub params: Vec<f64>,
    pub covariance: DMatrix<f64>,
    /// 1σ errors (sqrt of the covariance diagonal).
    pub errors: Vec<f64>,
    pub chi2: f64,
    pub iterations: usize,
}

/// Normalized residuals `(y - ŷ) / σ` at `params`.
pub fn normalized_residuals(model: ModelKind, obs: &[Observation], params: &[f64]) -> DVector<f64> {
    DVector::from_iterator(
        obs.len(),
        obs.iter().map(|o| (o.y - predict(model, o.x, params)) / o.sigma),
    )
}

/// Forward-difference Jacobian of the normalized residuals (`n × k`).
pub fn residual_jacobian(
    model: ModelKind,
    obs: &[Observation],
    params: &[f64],
    base: &DVector<f64>,
) -> DMatrix<f64> {
    let mut jac = DMatrix::<f64>::zeros(obs.len(), params.len());
    let mut shifted = params.to_vec();

    for (j, &p) in params.iter().enumerate() {
        let h = if p != 0.0 { FD_RELATIVE_STEP * p.abs() } else { FD_RELATIVE_STEP };
        shifted[j] = p + h;
        let r = normalized_residuals(model, obs, &shifted);
        jac.set_column(j, &((r - base) / h));
        shifted[j] = p;
    }

    jac
}

/// Covariance `(JᵀJ)⁻¹` of the parameters at `params`.
///
/// `None` when the Jacobian is not finite or the matrix cannot be inverted.
pub fn covariance_at(model: ModelKind, obs: &[Observation], params: &[f64]) -> Option<DMatrix<f64>> {
    let base = normalized_residuals(model, obs, params);
    if base.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let jac = residual_jacobian(model, obs, params, &base);
    if jac.iter().any(|v| !v.is_finite()) {
        return None;
    }
    covariance_from_jacobian(&jac)
}

/// Fit `model` to `obs` starting from `p0` with Levenberg–Marquardt.
///
/// Errors (exit code 4) when the starting point is undefined, the iteration
/// does not converge, or the covariance cannot be computed.
pub fn curve_fit(
    model: ModelKind,
    obs: &[Observation],
    p0: &[f64],
    opts: &CurveFitOptions,
) -> Result<CurveFit, AppError> {
    let k = p0.len();
    if k == 0 || k != model.param_count() {
        return Err(AppError::input(format!(
            "curve fit: {} starting values given for {} parameters.",
            k,
            model.param_count()
        )));
    }
    if obs.len() < k {
        return Err(AppError::numeric("curve fit: fewer observations than parameters."));
    }

    let mut params = p0.to_vec();
    let mut residuals = normalized_residuals(model, obs, &params);
    let mut cost = residuals.norm_squared();
    if !cost.is_finite() {
        return Err(AppError::numeric(
            "curve fit: model is undefined at the starting values.",
        ));
    }

    let mut damping = opts.initial_damping;
    let mut converged = false;
    let mut iterations = 0usize;

    while iterations < opts.max_iterations {
        iterations += 1;

        let jac = residual_jacobian(model, obs, &params, &residuals);
        let jtj = jac.transpose() * &jac;
        let gradient = jac.transpose() * &residuals;
        if gradient.iter().any(|v| !v.is_finite()) {
            return Err(AppError::numeric("curve fit: non-finite Jacobian."));
        }
        if gradient.amax() == 0.0 {
            converged = true;
            break;
        }

        let rhs = -gradient.clone();

        // Marquardt scaling: damp along diag(JᵀJ) so the step is unit-free.
        let mut accepted = false;
        while damping <= MAX_DAMPING {
            let mut lhs = jtj.clone();
            lhs.set_diagonal(&jtj.diagonal().map(|d| d + damping * d.max(f64::MIN_POSITIVE)));
            let Some(step) = solve_least_squares(&lhs, &rhs) else {
                damping *= DAMPING_UP;
                continue;
            };

            let trial: Vec<f64> = params.iter().zip(step.iter()).map(|(p, s)| p + s).collect();
            let trial_residuals = normalized_residuals(model, obs, &trial);
            let trial_cost = trial_residuals.norm_squared();

            if trial_cost.is_finite() && trial_cost < cost {
                let reduction = (cost - trial_cost) / cost.max(f64::MIN_POSITIVE);
                let small_step = step
                    .iter()
                    .zip(params.iter())
                    .all(|(s, p)| s.abs() <= opts.x_tol * (p.abs() + opts.x_tol));

                params = trial;
                residuals = trial_residuals;
                cost = trial_cost;
                damping = (damping * DAMPING_DOWN).max(1e-12);
                accepted = true;

                if reduction <= opts.f_tol || small_step {
                    converged = true;
                }
                break;
            }
            damping *= DAMPING_UP;
        }

        // No downhill step at any damping: already at the minimum.
        if !accepted || converged {
            converged = true;
            break;
        }
    }

    if !converged {
        return Err(AppError::numeric(format!(
            "curve fit did not converge within {} iterations.",
            opts.max_iterations
        )));
    }

    let covariance = covariance_at(model, obs, &params)
        .ok_or_else(|| AppError::numeric("curve fit: covariance could not be estimated."))?;
    let errors = standard_errors(&covariance);
    debug!(iterations, chi2 = cost, ?params, ?errors, "curve fit converged");

    Ok(CurveFit {
        params,
        covariance,
        errors,
        chi2: cost,
        iterations,
    })
}
