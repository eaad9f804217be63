//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - printed by the reporter

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One measured data point.
///
/// `x` is the independent variable (energy, time), `y` the measured value
/// (transmission coefficient, activity) and `sigma` its 1σ uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub sigma: f64,
}

impl Observation {
    pub fn new(x: f64, y: f64, sigma: f64) -> Self {
        Self { x, y, sigma }
    }
}

/// Column order of a three-field data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnLayout {
    /// `observed, independent, uncertainty` (tunnelling data).
    ObservedFirst,
    /// `independent, observed, uncertainty` (decay data).
    IndependentFirst,
}

impl ColumnLayout {
    /// Map the three raw fields (file order) onto an observation.
    pub fn arrange(self, fields: [f64; 3]) -> Observation {
        match self {
            ColumnLayout::ObservedFirst => Observation::new(fields[1], fields[0], fields[2]),
            ColumnLayout::IndependentFirst => Observation::new(fields[0], fields[1], fields[2]),
        }
    }

    /// Inverse of [`ColumnLayout::arrange`], used when writing data files.
    pub fn fields(self, obs: &Observation) -> [f64; 3] {
        match self {
            ColumnLayout::ObservedFirst => [obs.y, obs.x, obs.sigma],
            ColumnLayout::IndependentFirst => [obs.x, obs.y, obs.sigma],
        }
    }
}

/// Physically valid range for the raw fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidDomain {
    /// Every field must lie in `[0, 1]` (normalized transmission data).
    UnitInterval,
    /// Every field must be non-zero (a zero marks a missing measurement).
    NonZero,
}

impl ValidDomain {
    /// Check one raw field against the domain.
    pub fn contains(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            ValidDomain::UnitInterval => (0.0..=1.0).contains(&value),
            ValidDomain::NonZero => value != 0.0,
        }
    }
}

/// How to read one dataset's files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub layout: ColumnLayout,
    /// Leading lines to discard in every file.
    pub skip_header: usize,
    /// Multiplier applied to `x` after parsing (unit conversion).
    pub x_scale: f64,
    /// Multiplier applied to `y` and `sigma` after parsing.
    pub y_scale: f64,
    /// Domain checked on the raw (unscaled) fields.
    pub domain: ValidDomain,
}

impl DatasetSpec {
    /// Boron nitride tunnelling data: `T, E, σ_T`, all normalized.
    pub fn tunnelling() -> Self {
        Self {
            layout: ColumnLayout::ObservedFirst,
            skip_header: 1,
            x_scale: 1.0,
            y_scale: 1.0,
            domain: ValidDomain::UnitInterval,
        }
    }

    /// Nuclear decay data: time in hours, activity and error in TBq.
    pub fn decay() -> Self {
        Self {
            layout: ColumnLayout::IndependentFirst,
            skip_header: 1,
            x_scale: SECONDS_PER_HOUR,
            y_scale: BQ_PER_TBQ,
            domain: ValidDomain::NonZero,
        }
    }
}

pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const BQ_PER_TBQ: f64 = 1e12;

/// Concrete fitted model kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Electron tunnelling through a boron nitride barrier of thickness `d`.
    Tunnelling,
    /// Activity of Rb-79 fed by Sr-79 decay.
    Decay,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Tunnelling => "BN tunnelling",
            ModelKind::Decay => "Sr-79 -> Rb-79 decay chain",
        }
    }

    /// Number of free parameters.
    pub fn param_count(self) -> usize {
        self.param_names().len()
    }

    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            ModelKind::Tunnelling => &["d"],
            ModelKind::Decay => &["lambda_rb", "lambda_sr"],
        }
    }

    /// How this kind's data files are laid out.
    pub fn dataset_spec(self) -> DatasetSpec {
        match self {
            ModelKind::Tunnelling => DatasetSpec::tunnelling(),
            ModelKind::Decay => DatasetSpec::decay(),
        }
    }
}

/// Which optimizer drives the first and second fit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FitStrategy {
    /// Fixed-step hill climbing along each parameter axis.
    HillClimb,
    /// Nelder–Mead downhill simplex.
    Simplex,
}

/// A per-observation fitted value (used for reports and exports).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ObservationResidual {
    pub obs: Observation,
    pub y_fit: f64,
    pub residual: f64,
    /// `residual / sigma`.
    pub pull: f64,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub chi2: f64,
    pub reduced_chi2: f64,
    /// Observations used by the final fit.
    pub n: usize,
    /// Free parameters.
    pub k: usize,
    /// Observations dropped by the outlier pass.
    pub rejected: usize,
}

/// Fit output for a single model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ModelKind,
    pub strategy: FitStrategy,
    pub params: Vec<f64>,
    /// 1σ parameter errors (sqrt of the covariance diagonal).
    pub errors: Vec<f64>,
    pub quality: FitQuality,
}

/// A physical quantity computed from the fitted parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedQuantity {
    pub name: String,
    pub value: f64,
    /// Propagated 1σ error, when one is defined.
    pub error: Option<f64>,
    pub unit: String,
}

/// Run configuration for the tunnelling exercise.
#[derive(Debug, Clone)]
pub struct TunnellingConfig {
    pub data: PathBuf,
    pub strategy: FitStrategy,
    pub initial_d: f64,
    pub step: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub reject_outliers: bool,
    pub output: OutputConfig,
}

/// Run configuration for the decay exercise.
#[derive(Debug, Clone)]
pub struct DecayConfig {
    pub data: Vec<PathBuf>,
    pub strategy: FitStrategy,
    pub initial: [f64; 2],
    pub reject_outliers: bool,
    /// Grid points per axis for the chi-squared contour surface.
    pub contour_resolution: usize,
    /// Half-width of the contour window, in parameter standard errors.
    pub contour_sigmas: f64,
    pub output: OutputConfig,
}

/// Shared plotting/export settings.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export_summary: Option<PathBuf>,
    pub export_residuals: Option<PathBuf>,
}

/// Validated inputs for the bounce exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceInputs {
    pub initial_height: f64,
    pub minimum_height: f64,
    pub efficiency: f64,
}
