//! Synthetic tunnelling and decay datasets with known parameters.
//!
//! Points are evenly spaced over the requested range, the true model value
//! gets Gaussian noise with a relative standard deviation, and a small share
//! of points is pushed `±k·σ` away to exercise the outlier pass. Files are
//! written in the dataset's native column order and units, with a header.

use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::domain::{DatasetSpec, ModelKind, Observation, ValidDomain};
use crate::error::{AppError, EXIT_INPUT, EXIT_NUMERIC, EXIT_OUTPUT};
use crate::models::predict;

/// Generation settings. `x_min`/`x_max` are in file units (eV, hours).
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub params: Vec<f64>,
    pub points: usize,
    pub x_min: f64,
    pub x_max: f64,
    /// Relative 1σ noise on each value.
    pub noise: f64,
    pub outlier_prob: f64,
    /// Outlier jump size in σ.
    pub outlier_k: f64,
    pub seed: u64,
    pub output: PathBuf,
}

impl SimulateConfig {
    /// Settings resembling the lab data for `kind`.
    pub fn defaults_for(kind: ModelKind, output: PathBuf) -> Self {
        let (params, points, x_min, x_max) = match kind {
            ModelKind::Tunnelling => (vec![4.0], 16, 0.0, 0.3),
            ModelKind::Decay => (vec![5.0e-4, 5.0e-3], 40, 0.1, 1.0),
        };
        Self {
            params,
            points,
            x_min,
            x_max,
            noise: 0.05,
            outlier_prob: 0.05,
            outlier_k: 6.0,
            seed: 42,
            output,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SampleData {
    /// In model units (seconds, Bq).
    pub observations: Vec<Observation>,
    /// Indices into `observations` that received an outlier jump.
    pub outliers: Vec<usize>,
}

/// Generate a dataset for `kind` and write it to `config.output`.
pub fn simulate(kind: ModelKind, config: &SimulateConfig) -> Result<SampleData, AppError> {
    let sample = generate_sample(kind, config)?;
    write_dataset_csv(&config.output, kind, &sample.observations)?;
    debug!(
        path = %config.output.display(),
        points = sample.observations.len(),
        outliers = sample.outliers.len(),
        "wrote simulated dataset"
    );
    Ok(sample)
}

/// Generate observations without touching the filesystem.
pub fn generate_sample(kind: ModelKind, config: &SimulateConfig) -> Result<SampleData, AppError> {
    if config.params.len() != kind.param_count() {
        return Err(AppError::input(format!(
            "{} takes {} parameter(s), got {}.",
            kind.display_name(),
            kind.param_count(),
            config.params.len()
        )));
    }
    if config.points < 2 {
        return Err(AppError::input("At least 2 points are required."));
    }
    if !(config.x_min.is_finite() && config.x_max.is_finite() && config.x_max > config.x_min) {
        return Err(AppError::input("Invalid x range for simulation."));
    }
    if !(config.noise.is_finite() && config.noise > 0.0) {
        return Err(AppError::input("Noise must be > 0."));
    }
    if !(0.0..1.0).contains(&config.outlier_prob) || !(config.outlier_k.is_finite() && config.outlier_k > 0.0) {
        return Err(AppError::input("Invalid outlier settings."));
    }

    let spec = kind.dataset_spec();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AppError::new(EXIT_NUMERIC, format!("Noise distribution error: {e}")))?;

    let mut observations = Vec::with_capacity(config.points);
    let mut outliers = Vec::new();

    for i in 0..config.points {
        let raw_x = config.x_min + (config.x_max - config.x_min) * i as f64 / (config.points - 1) as f64;
        let x = raw_x * spec.x_scale;
        let truth = predict(kind, x, &config.params);
        if !truth.is_finite() || truth == 0.0 {
            return Err(AppError::new(
                EXIT_INPUT,
                format!("Model is undefined or zero at x = {raw_x}; adjust the range or parameters."),
            ));
        }

        let sigma = config.noise * truth.abs();
        let z = normal.sample(&mut rng);
        let jump = sample_jump(&mut rng, config.outlier_prob, config.outlier_k);
        if jump != 0.0 {
            outliers.push(i);
        }

        let mut y = truth + sigma * (z + jump);
        if spec.domain == ValidDomain::UnitInterval {
            y = y.clamp(0.0, 1.0);
        }
        observations.push(Observation::new(x, y, sigma));
    }

    Ok(SampleData { observations, outliers })
}

/// Write observations in `kind`'s native layout and units.
pub fn write_dataset_csv(path: &Path, kind: ModelKind, observations: &[Observation]) -> Result<(), AppError> {
    let spec = kind.dataset_spec();
    let mut wtr = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to create dataset CSV '{}': {e}", path.display()),
        )
    })?;

    wtr.write_record(column_names(kind))
        .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to write CSV header: {e}")))?;
    for obs in observations {
        let fields = spec.layout.fields(&unscale(&spec, obs));
        wtr.write_record(fields.iter().map(|v| v.to_string()))
            .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to write CSV row: {e}")))?;
    }
    wtr.flush()
        .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to flush CSV: {e}")))?;
    Ok(())
}

fn column_names(kind: ModelKind) -> [&'static str; 3] {
    match kind {
        ModelKind::Tunnelling => ["transmission", "energy_ev", "transmission_error"],
        ModelKind::Decay => ["time_hours", "activity_tbq", "activity_error_tbq"],
    }
}

fn unscale(spec: &DatasetSpec, obs: &Observation) -> Observation {
    Observation::new(obs.x / spec.x_scale, obs.y / spec.y_scale, obs.sigma / spec.y_scale)
}

fn sample_jump(rng: &mut StdRng, prob: f64, k: f64) -> f64 {
    let roll: f64 = rng.r#gen();
    if roll < prob {
        if rng.r#gen::<bool>() { k } else { -k }
    } else {
        0.0
    }
}
