//! Fitting routines for a single model kind.
//!
//! Given:
//! - observations `(x_i, y_i, σ_i)`
//! - an initial parameter guess
//! - a minimization strategy
//!
//! we:
//! - minimize chi-squared once on all observations
//! - drop observations more than 3σ away from that fit
//! - minimize again, from the same initial guess, on the kept observations
//! - estimate 1σ parameter errors from the covariance of a weighted
//!   least-squares fit
//!
//! The rejection pass runs exactly once; it is never iterated.

use tracing::{debug, info, warn};

use crate::domain::{FitQuality, FitResult, FitStrategy, ModelKind, Observation};
use crate::error::AppError;
use crate::fit::curve_fit::{CurveFitOptions, covariance_at, curve_fit};
use crate::fit::hill_climb::{HillClimbOptions, hill_climb};
use crate::fit::objective::{Minimum, chi_squared_objective};
use crate::fit::simplex::{SimplexOptions, nelder_mead};
use crate::math::{degrees_of_freedom, reduced_chi_squared, standard_errors};
use crate::models::predict;

/// Observations further than this many σ from the first fit are rejected.
pub const OUTLIER_SIGMAS: f64 = 3.0;

/// Fitting options that affect how a model is calibrated.
#[derive(Debug, Clone)]
pub struct FitOptions {
    pub strategy: FitStrategy,
    /// Used when `strategy` is [`FitStrategy::HillClimb`].
    pub hill_climb: HillClimbOptions,
    /// Used when `strategy` is [`FitStrategy::Simplex`].
    pub simplex: SimplexOptions,
    pub curve_fit: CurveFitOptions,
    /// Run the single 3σ rejection + refit pass.
    pub reject_outliers: bool,
}

impl FitOptions {
    /// Default settings for `strategy` on a `k`-parameter model.
    pub fn new(strategy: FitStrategy, k: usize) -> Self {
        Self {
            strategy,
            hill_climb: HillClimbOptions {
                steps: vec![1e-4; k],
                tolerance: 1e-5,
                max_iterations: 1_000_000,
            },
            simplex: SimplexOptions::default(),
            curve_fit: CurveFitOptions::default(),
            reject_outliers: true,
        }
    }
}

/// Both passes of a fit with rejection.
#[derive(Debug, Clone)]
pub struct TwoPassFit {
    pub first: Minimum,
    /// Identical to `first` when nothing was rejected (or rejection is off).
    pub second: Minimum,
    pub kept: Vec<Observation>,
    pub rejected: Vec<Observation>,
}

/// Final fit together with the data split it was computed on.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub result: FitResult,
    pub kept: Vec<Observation>,
    pub rejected: Vec<Observation>,
    pub minimum: Minimum,
}

/// Minimize chi-squared of `model` over `obs` once.
pub fn fit_model(
    model: ModelKind,
    obs: &[Observation],
    initial: &[f64],
    opts: &FitOptions,
) -> Result<Minimum, AppError> {
    if obs.is_empty() {
        return Err(AppError::new(crate::error::EXIT_NO_DATA, "No data points to fit."));
    }
    if initial.len() != model.param_count() {
        return Err(AppError::input(format!(
            "{} needs {} initial values, got {}.",
            model.display_name(),
            model.param_count(),
            initial.len()
        )));
    }

    let objective = chi_squared_objective(model, obs);
    let min = match opts.strategy {
        FitStrategy::HillClimb => hill_climb(objective, initial, &opts.hill_climb)?,
        FitStrategy::Simplex => nelder_mead(objective, initial, &opts.simplex)?,
    };

    if !min.fun.is_finite() {
        return Err(AppError::numeric(format!(
            "{} fit failed: the model is undefined at the initial guess {:?}.",
            model.display_name(),
            initial
        )));
    }
    debug!(model = ?model, params = ?min.x, chi2 = min.fun, "fit pass complete");
    Ok(min)
}

/// Split `obs` into (kept, rejected) by `|y - ŷ| > sigmas · σ`.
pub fn partition_outliers(
    model: ModelKind,
    obs: &[Observation],
    params: &[f64],
    sigmas: f64,
) -> (Vec<Observation>, Vec<Observation>) {
    obs.iter()
        .partition(|o| !((o.y - predict(model, o.x, params)).abs() > sigmas * o.sigma))
}

/// Fit, reject 3σ outliers once, and refit from the same initial guess.
pub fn fit_with_rejection(
    model: ModelKind,
    obs: &[Observation],
    initial: &[f64],
    opts: &FitOptions,
) -> Result<TwoPassFit, AppError> {
    let first = fit_model(model, obs, initial, opts)?;

    if !opts.reject_outliers {
        return Ok(TwoPassFit {
            second: first.clone(),
            first,
            kept: obs.to_vec(),
            rejected: Vec::new(),
        });
    }

    let (kept, rejected) = partition_outliers(model, obs, &first.x, OUTLIER_SIGMAS);
    if rejected.is_empty() {
        return Ok(TwoPassFit {
            second: first.clone(),
            first,
            kept,
            rejected,
        });
    }

    for o in &rejected {
        warn!(x = o.x, y = o.y, sigma = o.sigma, "outlier rejected (> 3 sigma from first fit)");
    }
    degrees_of_freedom(kept.len(), model.param_count())?;

    let second = fit_model(model, &kept, initial, opts)?;
    Ok(TwoPassFit {
        first,
        second,
        kept,
        rejected,
    })
}

/// 1σ errors for `best` on `obs`.
///
/// Taken from a least-squares fit started at `initial`; when that fails the
/// covariance is evaluated at `best` directly, and when that fails too the
/// errors are NaN.
pub fn parameter_errors(
    model: ModelKind,
    obs: &[Observation],
    initial: &[f64],
    best: &[f64],
    opts: &CurveFitOptions,
) -> Vec<f64> {
    match curve_fit(model, obs, initial, opts) {
        Ok(fit) if fit.errors.iter().all(|e| e.is_finite()) => return fit.errors,
        Ok(_) => debug!("least-squares errors not finite, using covariance at the best fit"),
        Err(err) => debug!(%err, "least-squares fit failed, using covariance at the best fit"),
    }

    if let Some(cov) = covariance_at(model, obs, best) {
        let errors = standard_errors(&cov);
        if errors.iter().all(|e| e.is_finite()) {
            return errors;
        }
    }

    warn!(model = ?model, "parameter uncertainties could not be estimated");
    vec![f64::NAN; model.param_count()]
}

/// Run the full fit: two passes, errors and quality.
pub fn fit_observations(
    model: ModelKind,
    obs: &[Observation],
    initial: &[f64],
    opts: &FitOptions,
) -> Result<FitOutcome, AppError> {
    let k = model.param_count();
    degrees_of_freedom(obs.len(), k)?;

    let passes = fit_with_rejection(model, obs, initial, opts)?;
    let errors = parameter_errors(model, &passes.kept, initial, &passes.second.x, &opts.curve_fit);

    let chi2 = passes.second.fun;
    let n = passes.kept.len();
    let reduced_chi2 = reduced_chi_squared(chi2, n, k)?;

    info!(
        model = ?model,
        params = ?passes.second.x,
        chi2,
        reduced_chi2,
        rejected = passes.rejected.len(),
        "fit complete"
    );

    Ok(FitOutcome {
        result: FitResult {
            model,
            strategy: opts.strategy,
            params: passes.second.x.clone(),
            errors,
            quality: FitQuality {
                chi2,
                reduced_chi2,
                n,
                k,
                rejected: passes.rejected.len(),
            },
        },
        kept: passes.kept,
        rejected: passes.rejected,
        minimum: passes.second,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunnelling_obs(d: f64) -> Vec<Observation> {
        (0..=10)
            .map(|i| {
                let e = i as f64 * 0.03;
                Observation::new(e, predict(ModelKind::Tunnelling, e, &[d]), 0.005)
            })
            .collect()
    }

    fn decay_obs(params: [f64; 2]) -> Vec<Observation> {
        (1..=30)
            .map(|i| {
                let t = i as f64 * 600.0;
                let a = predict(ModelKind::Decay, t, &params);
                Observation::new(t, a, 0.02 * a)
            })
            .collect()
    }

    #[test]
    fn hill_climb_recovers_thickness_from_default_guess() {
        let obs = tunnelling_obs(4.0);
        let opts = FitOptions::new(FitStrategy::HillClimb, 1);
        let out = fit_observations(ModelKind::Tunnelling, &obs, &[2.5], &opts).unwrap();
        assert!((out.result.params[0] - 4.0).abs() < 1e-3, "{:?}", out.result.params);
        assert_eq!(out.result.quality.rejected, 0);
        assert_eq!(out.result.quality.n, obs.len());
        assert!(out.result.errors[0].is_finite());
    }

    #[test]
    fn simplex_recovers_decay_constants() {
        let truth = [5.0e-4, 5.0e-3];
        let obs = decay_obs(truth);
        let mut opts = FitOptions::new(FitStrategy::Simplex, 2);
        opts.simplex.x_tol = 1e-10;
        opts.simplex.f_tol = 1e-10;
        opts.simplex.max_iterations = Some(5_000);
        opts.simplex.max_evaluations = Some(10_000);
        let out = fit_observations(ModelKind::Decay, &obs, &[4.0e-4, 6.0e-3], &opts).unwrap();
        assert!((out.result.params[0] / truth[0] - 1.0).abs() < 1e-3, "{:?}", out.result.params);
        assert!((out.result.params[1] / truth[1] - 1.0).abs() < 1e-3, "{:?}", out.result.params);
        assert!(out.result.quality.reduced_chi2 < 1e-3);
    }

    #[test]
    fn gross_outlier_is_rejected_and_refit() {
        let mut obs = tunnelling_obs(4.0);
        obs[5].y += 20.0 * obs[5].sigma;
        let opts = FitOptions::new(FitStrategy::HillClimb, 1);
        let out = fit_observations(ModelKind::Tunnelling, &obs, &[2.5], &opts).unwrap();

        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].x, obs[5].x);
        assert_eq!(out.kept.len(), obs.len() - 1);
        assert_eq!(out.result.quality.n, obs.len() - 1);
        assert!((out.result.params[0] - 4.0).abs() < 1e-3);
    }

    #[test]
    fn clean_data_second_pass_equals_first() {
        let obs = tunnelling_obs(4.0);
        let opts = FitOptions::new(FitStrategy::HillClimb, 1);
        let passes = fit_with_rejection(ModelKind::Tunnelling, &obs, &[2.5], &opts).unwrap();
        assert!(passes.rejected.is_empty());
        assert_eq!(passes.first, passes.second);
    }

    #[test]
    fn rejection_can_be_disabled() {
        let mut obs = tunnelling_obs(4.0);
        obs[3].y += 20.0 * obs[3].sigma;
        let mut opts = FitOptions::new(FitStrategy::HillClimb, 1);
        opts.reject_outliers = false;
        let passes = fit_with_rejection(ModelKind::Tunnelling, &obs, &[2.5], &opts).unwrap();
        assert!(passes.rejected.is_empty());
        assert_eq!(passes.kept.len(), obs.len());
    }

    #[test]
    fn partition_splits_at_three_sigma() {
        let y_fit = predict(ModelKind::Tunnelling, 0.1, &[4.0]);
        let obs = [
            Observation::new(0.1, y_fit + 2.9 * 0.01, 0.01),
            Observation::new(0.1, y_fit + 3.5 * 0.01, 0.01),
            Observation::new(0.1, y_fit - 3.5 * 0.01, 0.01),
            Observation::new(0.1, y_fit - 2.9 * 0.01, 0.01),
        ];
        let (kept, rejected) = partition_outliers(ModelKind::Tunnelling, &obs, &[4.0], OUTLIER_SIGMAS);
        assert_eq!(kept, vec![obs[0], obs[3]]);
        assert_eq!(rejected, vec![obs[1], obs[2]]);
    }

    #[test]
    fn too_few_observations_is_a_no_data_error() {
        let obs = tunnelling_obs(4.0);
        let opts = FitOptions::new(FitStrategy::Simplex, 2);
        let err = fit_observations(ModelKind::Decay, &obs[..2], &[5e-4, 5e-3], &opts).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_NO_DATA);
    }

    #[test]
    fn wrong_initial_length_is_an_input_error() {
        let obs = tunnelling_obs(4.0);
        let opts = FitOptions::new(FitStrategy::HillClimb, 1);
        let err = fit_model(ModelKind::Tunnelling, &obs, &[2.5, 1.0], &opts).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
    }
}
