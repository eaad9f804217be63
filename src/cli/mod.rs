//! Command-line parsing for the `labfit` lab exercises.
//!
//! The goal of this module is to keep **argument parsing** and **prompting**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{FitStrategy, ModelKind};

pub mod prompt;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "labfit", version, about = "Physics lab exercises: bouncing ball, BN tunnelling, Rb/Sr decay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Count complete bounces of a dropped ball and time them.
    ///
    /// Values not given as flags are asked for interactively.
    Bounce(BounceArgs),
    /// Fit the boron nitride thickness to tunnelling transmission data.
    Tunnel(TunnelArgs),
    /// Fit Rb-79 and Sr-79 decay constants to activity data.
    Decay(DecayArgs),
    /// Write a synthetic tunnelling or decay dataset.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct BounceArgs {
    /// Drop height (m).
    #[arg(long)]
    pub initial_height: Option<f64>,

    /// Lowest apex height that still counts as a bounce (m).
    #[arg(long)]
    pub minimum_height: Option<f64>,

    /// Fraction of the height kept on each bounce, in (0, 1).
    #[arg(long)]
    pub efficiency: Option<f64>,

    /// Print the apex height of every bounce.
    #[arg(long)]
    pub show_heights: bool,

    /// Draw the apex heights against time.
    #[arg(long)]
    pub plot: bool,

    /// Directory for SVG plots.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Terminal plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Terminal plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

/// Plot and export options shared by the fitting subcommands.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Directory for SVG plots.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Skip the terminal and SVG plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Terminal plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Terminal plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Write a JSON fit summary.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Write per-observation residuals to CSV.
    #[arg(long = "export-residuals", value_name = "CSV")]
    pub export_residuals: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TunnelArgs {
    /// Data file: transmission, energy (eV), transmission error.
    #[arg(default_value = "Tunnelling_data_BN.csv")]
    pub data: PathBuf,

    #[arg(long, value_enum, default_value_t = FitStrategy::HillClimb)]
    pub strategy: FitStrategy,

    /// Starting thickness (Å).
    #[arg(long, default_value_t = 2.5)]
    pub initial_d: f64,

    /// Hill-climbing step (Å).
    #[arg(long, default_value_t = 1e-4)]
    pub step: f64,

    /// Stop once an accepted step improves chi-squared by no more than this.
    #[arg(long, default_value_t = 1e-5)]
    pub tolerance: f64,

    #[arg(long, default_value_t = 1_000_000)]
    pub max_iterations: usize,

    /// Keep every observation (skip the 3σ rejection and refit).
    #[arg(long)]
    pub no_reject: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DecayArgs {
    /// Data files: time (hours), activity (TBq), activity error (TBq).
    #[arg(default_values = ["Nuclear_data_1.csv", "Nuclear_data_2.csv"])]
    pub data: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = FitStrategy::Simplex)]
    pub strategy: FitStrategy,

    /// Starting Rb-79 decay constant (s⁻¹).
    #[arg(long, default_value_t = 5e-4)]
    pub lambda_rb: f64,

    /// Starting Sr-79 decay constant (s⁻¹).
    #[arg(long, default_value_t = 5e-3)]
    pub lambda_sr: f64,

    /// Keep every observation (skip the 3σ rejection and refit).
    #[arg(long)]
    pub no_reject: bool,

    /// Grid points per axis for the chi-squared contours.
    #[arg(long, default_value_t = 200)]
    pub contour_resolution: usize,

    /// Contour window half-width, in parameter standard errors.
    #[arg(long, default_value_t = 4.0)]
    pub contour_sigmas: f64,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Which dataset to generate.
    #[arg(value_enum)]
    pub kind: ModelKind,

    /// Output CSV path.
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    /// True parameter values (defaults: d = 4.0, or λ_Rb = 5e-4 and λ_Sr = 5e-3).
    #[arg(long = "param", value_name = "VALUE")]
    pub params: Vec<f64>,

    #[arg(long)]
    pub points: Option<usize>,

    /// First x value in file units (eV or hours).
    #[arg(long)]
    pub x_min: Option<f64>,

    /// Last x value in file units (eV or hours).
    #[arg(long)]
    pub x_max: Option<f64>,

    /// Relative 1σ noise.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Probability that a point is pushed off as an outlier.
    #[arg(long, default_value_t = 0.05)]
    pub outlier_prob: f64,

    /// Outlier jump size in σ.
    #[arg(long, default_value_t = 6.0)]
    pub outlier_k: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_defaults_to_both_data_files() {
        let cli = Cli::try_parse_from(["labfit", "decay"]).unwrap();
        let Command::Decay(args) = cli.command else {
            panic!("expected decay");
        };
        assert_eq!(
            args.data,
            vec![PathBuf::from("Nuclear_data_1.csv"), PathBuf::from("Nuclear_data_2.csv")]
        );
        assert_eq!(args.strategy, FitStrategy::Simplex);
        assert!(!args.no_reject);
    }

    #[test]
    fn tunnel_flags_parse() {
        let cli = Cli::try_parse_from([
            "labfit",
            "tunnel",
            "my.csv",
            "--strategy",
            "simplex",
            "--initial-d",
            "3",
            "--no-reject",
            "--export",
            "fit.json",
        ])
        .unwrap();
        let Command::Tunnel(args) = cli.command else {
            panic!("expected tunnel");
        };
        assert_eq!(args.data, PathBuf::from("my.csv"));
        assert_eq!(args.strategy, FitStrategy::Simplex);
        assert_eq!(args.initial_d, 3.0);
        assert!(args.no_reject);
        assert_eq!(args.output.export, Some(PathBuf::from("fit.json")));
    }

    #[test]
    fn simulate_takes_repeated_params() {
        let cli =
            Cli::try_parse_from(["labfit", "simulate", "decay", "-o", "d.csv", "--param", "4e-4", "--param", "6e-3"])
                .unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.kind, ModelKind::Decay);
        assert_eq!(args.params, vec![4e-4, 6e-3]);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["labfit", "tunnel", "--strategy", "grid"]).is_err());
    }
}
