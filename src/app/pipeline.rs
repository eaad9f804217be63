//! Shared exercise pipelines used by the CLI front-end.
//!
//! Each pipeline is: load data -> two-pass fit -> residuals -> derived
//! quantities (-> chi-squared contours for two-parameter models). Printing,
//! plotting and exports live in `app`, so these functions only compute.

use tracing::debug;

use crate::domain::{BounceInputs, DecayConfig, DerivedQuantity, ModelKind, ObservationResidual, TunnellingConfig};
use crate::error::AppError;
use crate::fit::contour::{ChiSquaredSurface, ContourLevel, confidence_contours, contour_window, linspace};
use crate::fit::{FitOptions, FitOutcome, fit_observations};
use crate::io::ingest::{IngestedData, load_observation_set};
use crate::models::bounce::BounceProfile;
use crate::report::{compute_residuals, derived_quantities};

/// Hill-climbing step for a parameter, relative to its starting value.
const RELATIVE_STEP: f64 = 1e-3;

/// All computed outputs of one fitting run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub ingest: IngestedData,
    pub outcome: FitOutcome,
    /// Residuals of the kept observations against the final fit.
    pub residuals: Vec<ObservationResidual>,
    /// Residuals of the rejected observations against the final fit.
    pub rejected_residuals: Vec<ObservationResidual>,
    pub derived: Vec<DerivedQuantity>,
    pub contours: Option<ContourMap>,
}

/// Chi-squared surface around the decay fit and its iso-lines.
#[derive(Debug, Clone)]
pub struct ContourMap {
    pub surface: ChiSquaredSurface,
    pub levels: Vec<ContourLevel>,
    pub best: (f64, f64),
    pub chi2_min: f64,
}

/// Thickness of the BN barrier from tunnelling data.
pub fn run_tunnelling(config: &TunnellingConfig) -> Result<FitRun, AppError> {
    let model = ModelKind::Tunnelling;
    let ingest = load_observation_set(std::slice::from_ref(&config.data), &model.dataset_spec())?;

    let mut opts = FitOptions::new(config.strategy, model.param_count());
    opts.hill_climb.steps = vec![config.step];
    opts.hill_climb.tolerance = config.tolerance;
    opts.hill_climb.max_iterations = config.max_iterations;
    opts.reject_outliers = config.reject_outliers;

    let outcome = fit_observations(model, &ingest.observations, &[config.initial_d], &opts)?;
    finish(ingest, outcome, None)
}

/// Rb-79 and Sr-79 decay constants from activity data, with contours.
pub fn run_decay(config: &DecayConfig) -> Result<FitRun, AppError> {
    let model = ModelKind::Decay;
    if config.contour_resolution < 3 {
        return Err(AppError::input("Contour resolution must be at least 3."));
    }
    let ingest = load_observation_set(&config.data, &model.dataset_spec())?;

    let mut opts = FitOptions::new(config.strategy, model.param_count());
    opts.hill_climb.steps = config
        .initial
        .iter()
        .map(|v| (v.abs() * RELATIVE_STEP).max(f64::EPSILON))
        .collect();
    opts.reject_outliers = config.reject_outliers;

    let outcome = fit_observations(model, &ingest.observations, &config.initial, &opts)?;
    let contours = contour_map(&outcome, config.contour_resolution, config.contour_sigmas);
    finish(ingest, outcome, Some(contours))
}

/// Closed-form bounce history; inputs are already validated.
pub fn run_bounce(inputs: &BounceInputs) -> BounceProfile {
    let profile = BounceProfile::compute(inputs);
    debug!(count = profile.count, total_time = profile.total_time, "bounce profile");
    profile
}

fn finish(ingest: IngestedData, outcome: FitOutcome, contours: Option<ContourMap>) -> Result<FitRun, AppError> {
    let (model, params) = (outcome.result.model, &outcome.result.params);
    let residuals = compute_residuals(&outcome.kept, model, params)?;
    let rejected_residuals = compute_residuals(&outcome.rejected, model, params)?;
    let derived = derived_quantities(&outcome.result);
    Ok(FitRun {
        ingest,
        outcome,
        residuals,
        rejected_residuals,
        derived,
        contours,
    })
}

fn contour_map(outcome: &FitOutcome, resolution: usize, sigmas: f64) -> ContourMap {
    let params = &outcome.result.params;
    let errors = &outcome.result.errors;
    let (x0, x1) = contour_window(params[0], errors[0], sigmas);
    let (y0, y1) = contour_window(params[1], errors[1], sigmas);

    let xs = linspace(x0, x1, resolution);
    let ys = linspace(y0, y1, resolution);
    let surface = ChiSquaredSurface::compute(outcome.result.model, &outcome.kept, &xs, &ys);

    // The grid rarely hits the optimum exactly; never draw below the fit.
    let chi2_min = surface
        .min_value()
        .map_or(outcome.result.quality.chi2, |v| v.min(outcome.result.quality.chi2));
    let levels = confidence_contours(&surface, chi2_min);
    debug!(resolution, chi2_min, "chi-squared surface sampled");

    ContourMap {
        surface,
        levels,
        best: (params[0], params[1]),
        chi2_min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SimulateConfig, generate_sample, simulate, write_dataset_csv};
    use crate::domain::{FitStrategy, OutputConfig};
    use crate::error::{EXIT_INPUT, EXIT_NO_DATA};
    use std::path::{Path, PathBuf};

    fn output(dir: &Path) -> OutputConfig {
        OutputConfig {
            out_dir: dir.to_path_buf(),
            plot: false,
            plot_width: 60,
            plot_height: 15,
            export_summary: None,
            export_residuals: None,
        }
    }

    fn tunnelling_config(data: PathBuf, dir: &Path) -> TunnellingConfig {
        TunnellingConfig {
            data,
            strategy: FitStrategy::HillClimb,
            initial_d: 2.5,
            step: 1e-4,
            tolerance: 1e-5,
            max_iterations: 1_000_000,
            reject_outliers: true,
            output: output(dir),
        }
    }

    #[test]
    fn tunnelling_recovers_simulated_thickness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Tunnelling_data_BN.csv");
        let mut sim = SimulateConfig::defaults_for(ModelKind::Tunnelling, path.clone());
        sim.noise = 0.02;
        sim.outlier_prob = 0.1;
        sim.outlier_k = 10.0;
        let sample = simulate(ModelKind::Tunnelling, &sim).unwrap();

        let run = run_tunnelling(&tunnelling_config(path, dir.path())).unwrap();
        let d = run.outcome.result.params[0];
        assert!((d - 4.0).abs() < 0.05, "d = {d}");
        assert!(run.outcome.result.quality.rejected >= sample.outliers.len());
        assert_eq!(run.residuals.len(), run.outcome.kept.len());
        assert_eq!(run.rejected_residuals.len(), run.outcome.rejected.len());
        assert_eq!(run.derived[0].name, "layers");
        assert!(run.contours.is_none());
    }

    #[test]
    fn decay_fit_and_contours_from_two_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("Nuclear_data_1.csv");
        let second = dir.path().join("Nuclear_data_2.csv");

        let mut sim = SimulateConfig::defaults_for(ModelKind::Decay, first.clone());
        sim.noise = 0.02;
        sim.outlier_prob = 0.0;
        sim.x_max = 0.5;
        simulate(ModelKind::Decay, &sim).unwrap();
        sim.output = second.clone();
        sim.x_min = 0.55;
        sim.x_max = 1.0;
        sim.seed = 43;
        simulate(ModelKind::Decay, &sim).unwrap();

        let config = DecayConfig {
            data: vec![second, first],
            strategy: FitStrategy::Simplex,
            initial: [5.0e-4, 5.0e-3],
            reject_outliers: true,
            contour_resolution: 41,
            contour_sigmas: 4.0,
            output: output(dir.path()),
        };
        let run = run_decay(&config).unwrap();

        assert_eq!(run.ingest.rows_used, 80);
        assert!(run.ingest.observations.windows(2).all(|w| w[0].x <= w[1].x));

        let [rb, sr] = [run.outcome.result.params[0], run.outcome.result.params[1]];
        assert!((rb / 5.0e-4 - 1.0).abs() < 0.1, "λ_Rb = {rb}");
        assert!((sr / 5.0e-3 - 1.0).abs() < 0.1, "λ_Sr = {sr}");
        assert!(run.outcome.result.errors.iter().all(|e| e.is_finite() && *e > 0.0));
        assert_eq!(run.derived.len(), 2);

        let contours = run.contours.unwrap();
        assert_eq!(contours.levels.len(), 4);
        assert!(contours.chi2_min <= run.outcome.result.quality.chi2);
        assert!(contours.levels.iter().all(|l| !l.segments.is_empty()));
    }

    #[test]
    fn simplex_decay_fit_drops_an_injected_outlier() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Nuclear_data_1.csv");
        let mut sim = SimulateConfig::defaults_for(ModelKind::Decay, path.clone());
        sim.noise = 0.02;
        sim.outlier_prob = 0.0;
        let mut sample = generate_sample(ModelKind::Decay, &sim).unwrap();
        let bad = &mut sample.observations[20];
        bad.y += 15.0 * bad.sigma;
        let bad_x = bad.x;
        write_dataset_csv(&path, ModelKind::Decay, &sample.observations).unwrap();

        let config = DecayConfig {
            data: vec![path],
            strategy: FitStrategy::Simplex,
            initial: [5.0e-4, 5.0e-3],
            reject_outliers: true,
            contour_resolution: 21,
            contour_sigmas: 4.0,
            output: output(dir.path()),
        };
        let run = run_decay(&config).unwrap();

        let quality = &run.outcome.result.quality;
        assert!(quality.rejected > 0);
        assert_eq!(quality.n, run.ingest.rows_used - quality.rejected);
        assert_eq!(run.outcome.kept.len(), quality.n);
        assert!(run.outcome.rejected.iter().any(|o| (o.x - bad_x).abs() < 1e-6 * bad_x));
        assert!(run.outcome.kept.iter().all(|o| (o.x - bad_x).abs() >= 1e-6 * bad_x));
        assert_eq!(run.rejected_residuals.len(), quality.rejected);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_tunnelling(&tunnelling_config(dir.path().join("nope.csv"), dir.path())).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn file_without_valid_rows_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "T,E,err\nabc,def,ghi\n").unwrap();
        let err = run_tunnelling(&tunnelling_config(path, dir.path())).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }

    #[test]
    fn bounce_runs_closed_form() {
        let profile = run_bounce(&BounceInputs {
            initial_height: 10.0,
            minimum_height: 0.1,
            efficiency: 0.5,
        });
        assert_eq!(profile.count, 6);
    }
}
