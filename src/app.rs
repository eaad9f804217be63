//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the selected exercise pipeline
//! - prints reports/plots
//! - writes optional exports

use std::io::{BufRead, Write};
use std::path::Path;

use clap::Parser;
use tracing::warn;

use crate::cli::prompt::{self, GivenBounceInputs};
use crate::cli::{BounceArgs, Command, DecayArgs, OutputArgs, SimulateArgs, TunnelArgs};
use crate::data::{SimulateConfig, simulate};
use crate::domain::{DecayConfig, OutputConfig, TunnellingConfig};
use crate::error::AppError;
use crate::io::export::write_residuals_csv;
use crate::io::summary::{FitSummary, write_summary_json};
use crate::plot::{ChartSize, ChartText};
use crate::report;

pub mod pipeline;

use pipeline::FitRun;

/// Entry point for the `labfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Bounce(args) => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            handle_bounce(&args, &mut stdin.lock(), &mut stdout.lock())
        }
        Command::Tunnel(args) => handle_tunnel(&args, &mut std::io::stdout().lock()),
        Command::Decay(args) => handle_decay(&args, &mut std::io::stdout().lock()),
        Command::Simulate(args) => handle_simulate(&args),
    }
}

fn handle_bounce<R: BufRead, W: Write>(args: &BounceArgs, reader: &mut R, writer: &mut W) -> Result<(), AppError> {
    let given = GivenBounceInputs {
        initial_height: args.initial_height,
        minimum_height: args.minimum_height,
        efficiency: args.efficiency,
    };
    let interactive = given.initial_height.is_none() || given.minimum_height.is_none() || given.efficiency.is_none();

    let inputs = prompt::collect_bounce_inputs(given, reader, writer)?;
    let profile = pipeline::run_bounce(&inputs);
    print_to(writer, &report::format_bounce_report(&profile))?;

    if profile.count == 0 {
        return Ok(());
    }
    if profile.is_truncated() {
        warn!(count = profile.count, listed = profile.listed(), "only the first bounces are listed");
    }

    let show_heights = args.show_heights || (interactive && prompt::ask_yes_no(reader, writer, prompt::HEIGHTS_QUESTION)?);
    if show_heights {
        print_to(writer, &report::format_bounce_heights(&profile))?;
    }

    let plot = args.plot || (interactive && prompt::ask_yes_no(reader, writer, prompt::PLOT_QUESTION)?);
    if plot {
        let series = profile.decay_series();
        print_to(writer, &crate::plot::render_series_plot(&series, args.width, args.height))?;
        let path = args.out_dir.join("bounce_heights.svg");
        report_plot(writer, crate::plot::draw_bounce_chart(&path, &series, ChartSize::default()), &path)?;
    }

    Ok(())
}

fn handle_tunnel<W: Write>(args: &TunnelArgs, writer: &mut W) -> Result<(), AppError> {
    let config = tunnelling_config_from_args(args);
    let run = pipeline::run_tunnelling(&config)?;

    print_to(writer, &format!("{}\n", report::format_data_summary(&run.ingest)))?;
    print_to(writer, &report::format_rejected(&run.outcome.rejected))?;
    print_to(writer, &report::format_tunnelling_report(&run.outcome.result))?;

    if config.output.plot {
        render_fit_plots(
            writer,
            &run,
            &config.output,
            "tunnelling_fit.svg",
            ChartText {
                title: "Graph to Find Thickness of Boron Nitride",
                x_desc: "Energy (eV)",
                y_desc: "Transmission Coefficient",
            },
        )?;
    }

    write_exports(&run, &config.output)
}

fn handle_decay<W: Write>(args: &DecayArgs, writer: &mut W) -> Result<(), AppError> {
    let config = decay_config_from_args(args);
    let run = pipeline::run_decay(&config)?;

    print_to(writer, &format!("{}\n", report::format_data_summary(&run.ingest)))?;
    print_to(writer, &report::format_rejected(&run.outcome.rejected))?;
    print_to(writer, &report::format_decay_report(&run.outcome.result))?;

    if config.output.plot {
        render_fit_plots(
            writer,
            &run,
            &config.output,
            "activity_graph.svg",
            ChartText {
                title: "Activity against time for rubidium",
                x_desc: "Time (s)",
                y_desc: "Activity (Bq)",
            },
        )?;

        if let Some(map) = &run.contours {
            let path = config.output.out_dir.join("contour_plot.svg");
            let x_range = (map.surface.xs[0], map.surface.xs[map.surface.xs.len() - 1]);
            let y_range = (map.surface.ys[0], map.surface.ys[map.surface.ys.len() - 1]);
            let result = crate::plot::draw_contour_chart(
                &path,
                &map.levels,
                map.best,
                x_range,
                y_range,
                ChartText {
                    title: "χ² contours against parameters",
                    x_desc: "Rb decay constant values (s⁻¹)",
                    y_desc: "Sr decay constant values (s⁻¹)",
                },
                ChartSize::default(),
            );
            report_plot(writer, result, &path)?;
        }
    }

    write_exports(&run, &config.output)
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let config = simulate_config_from_args(args);
    let sample = simulate(args.kind, &config)?;
    println!(
        "Wrote {} {} points ({} outliers) to {}",
        sample.observations.len(),
        args.kind.display_name(),
        sample.outliers.len(),
        config.output.display()
    );
    Ok(())
}

/// Terminal plot plus the SVG chart of data and fitted curve.
fn render_fit_plots<W: Write>(
    writer: &mut W,
    run: &FitRun,
    output: &OutputConfig,
    file_name: &str,
    text: ChartText<'_>,
) -> Result<(), AppError> {
    let result = &run.outcome.result;
    let ascii = crate::plot::render_fit_plot(
        &run.outcome.kept,
        &run.outcome.rejected,
        result.model,
        &result.params,
        output.plot_width,
        output.plot_height,
    );
    print_to(writer, &format!("{ascii}\n"))?;

    let path = output.out_dir.join(file_name);
    let drawn = crate::plot::draw_fit_chart(
        &path,
        &run.outcome.kept,
        &run.outcome.rejected,
        result.model,
        &result.params,
        text,
        ChartSize::default(),
    );
    report_plot(writer, drawn, &path)
}

/// Plot failures never fail the run: the numeric report is already out.
fn report_plot<W: Write>(writer: &mut W, result: Result<(), AppError>, path: &Path) -> Result<(), AppError> {
    match result {
        Ok(()) => print_to(writer, &format!("Plot written to {}\n", path.display())),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "plot not written");
            Ok(())
        }
    }
}

fn write_exports(run: &FitRun, output: &OutputConfig) -> Result<(), AppError> {
    if let Some(path) = &output.export_summary {
        let summary = FitSummary::new(&run.outcome.result, &run.derived, &run.ingest);
        write_summary_json(path, &summary)?;
    }
    if let Some(path) = &output.export_residuals {
        write_residuals_csv(path, &run.residuals, &run.rejected_residuals)?;
    }
    Ok(())
}

fn print_to<W: Write>(writer: &mut W, text: &str) -> Result<(), AppError> {
    write!(writer, "{text}")
        .and_then(|_| writer.flush())
        .map_err(|e| AppError::new(crate::error::EXIT_OUTPUT, format!("Failed to write output: {e}")))
}

pub fn output_config_from_args(args: &OutputArgs) -> OutputConfig {
    OutputConfig {
        out_dir: args.out_dir.clone(),
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        export_summary: args.export.clone(),
        export_residuals: args.export_residuals.clone(),
    }
}

pub fn tunnelling_config_from_args(args: &TunnelArgs) -> TunnellingConfig {
    TunnellingConfig {
        data: args.data.clone(),
        strategy: args.strategy,
        initial_d: args.initial_d,
        step: args.step,
        tolerance: args.tolerance,
        max_iterations: args.max_iterations,
        reject_outliers: !args.no_reject,
        output: output_config_from_args(&args.output),
    }
}

pub fn decay_config_from_args(args: &DecayArgs) -> DecayConfig {
    DecayConfig {
        data: args.data.clone(),
        strategy: args.strategy,
        initial: [args.lambda_rb, args.lambda_sr],
        reject_outliers: !args.no_reject,
        contour_resolution: args.contour_resolution,
        contour_sigmas: args.contour_sigmas,
        output: output_config_from_args(&args.output),
    }
}

/// Start from the kind's defaults and apply whatever was given.
pub fn simulate_config_from_args(args: &SimulateArgs) -> SimulateConfig {
    let mut config = SimulateConfig::defaults_for(args.kind, args.out.clone());
    if !args.params.is_empty() {
        config.params = args.params.clone();
    }
    if let Some(points) = args.points {
        config.points = points;
    }
    if let Some(x_min) = args.x_min {
        config.x_min = x_min;
    }
    if let Some(x_max) = args.x_max {
        config.x_max = x_max;
    }
    config.noise = args.noise;
    config.outlier_prob = args.outlier_prob;
    config.outlier_k = args.outlier_k;
    config.seed = args.seed;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn bounce_args(argv: &[&str]) -> BounceArgs {
        let mut full = vec!["labfit", "bounce"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Bounce(args) => args,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn interactive_bounce_session() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().to_str().unwrap().to_string();
        let args = bounce_args(&["--out-dir", &out_dir]);
        let mut input = Cursor::new("10\n0.1\n0.5\nyes\nno\n");
        let mut output = Vec::new();
        handle_bounce(&args, &mut input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("The ball makes 6 complete bounces between 10.0 m and 0.1 m in 7.46 seconds."));
        assert!(text.contains("5.00m\n2.50m\n1.25m\n"));
        assert_eq!(text.lines().filter(|l| l.ends_with('m') && l.starts_with('0')).count(), 3);
        assert!(text.contains(
            "Would you like to see a graph of the decay in maximum bounce heights? Please enter \"yes\" or \"no\": "
        ));
        assert!(!dir.path().join("bounce_heights.svg").exists());
    }

    #[test]
    fn flags_skip_every_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().to_str().unwrap().to_string();
        let args = bounce_args(&[
            "--initial-height",
            "10",
            "--minimum-height",
            "2",
            "--efficiency",
            "0.5",
            "--plot",
            "--out-dir",
            &out_dir,
        ]);
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        handle_bounce(&args, &mut input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(!text.contains('?'));
        assert!(!text.contains("5.00m"));
        assert!(text.contains("Plot:"));
        assert!(dir.path().join("bounce_heights.svg").exists());
    }

    #[test]
    fn no_bounces_asks_nothing_more() {
        let args = bounce_args(&[]);
        let mut input = Cursor::new("10\n9\n0.5\n");
        let mut output = Vec::new();
        handle_bounce(&args, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with("The ball makes 0 complete bounces between 10.0 m and 9.0 m.\n"));
    }

    fn fit_args(argv: &[&str]) -> Command {
        let mut full = vec!["labfit"];
        full.extend_from_slice(argv);
        Cli::try_parse_from(full).unwrap().command
    }

    #[test]
    fn unwritable_plot_directory_does_not_fail_tunnel() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Tunnelling_data_BN.csv");
        let mut sim = SimulateConfig::defaults_for(crate::domain::ModelKind::Tunnelling, data.clone());
        sim.outlier_prob = 0.0;
        simulate(crate::domain::ModelKind::Tunnelling, &sim).unwrap();
        let missing = dir.path().join("no").join("such").join("dir");
        let summary = dir.path().join("fit.json");

        let Command::Tunnel(args) = fit_args(&[
            "tunnel",
            data.to_str().unwrap(),
            "--out-dir",
            missing.to_str().unwrap(),
            "--export",
            summary.to_str().unwrap(),
        ]) else {
            panic!("expected tunnel");
        };
        assert!(tunnelling_config_from_args(&args).output.plot);

        let mut output = Vec::new();
        let result = handle_tunnel(&args, &mut output);
        assert!(result.is_ok(), "{result:?}");

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("The fitted value for the thickness d of Boron nitride is"));
        assert!(text.contains("Plot:"));
        assert!(!text.contains("Plot written to"));
        assert!(!missing.exists());
        // Exports after the failed plot still run.
        assert!(summary.exists());
    }

    #[test]
    fn unwritable_plot_directory_does_not_fail_decay() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("Nuclear_data_1.csv");
        let mut sim = SimulateConfig::defaults_for(crate::domain::ModelKind::Decay, data.clone());
        sim.noise = 0.02;
        sim.outlier_prob = 0.0;
        simulate(crate::domain::ModelKind::Decay, &sim).unwrap();
        let missing = dir.path().join("missing");

        let Command::Decay(args) = fit_args(&[
            "decay",
            data.to_str().unwrap(),
            "--contour-resolution",
            "21",
            "--out-dir",
            missing.to_str().unwrap(),
        ]) else {
            panic!("expected decay");
        };

        let mut output = Vec::new();
        let result = handle_decay(&args, &mut output);
        assert!(result.is_ok(), "{result:?}");

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("The decay constant for Rubidium is"));
        assert!(text.contains("The reduced chi squared for the minimised chi squared line is"));
        assert!(!text.contains("Plot written to"));
        assert!(!missing.join("contour_plot.svg").exists());
    }

    #[test]
    fn simulate_args_override_defaults() {
        let cli = Cli::try_parse_from(["labfit", "simulate", "tunnelling", "-o", "t.csv", "--points", "5"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        let config = simulate_config_from_args(&args);
        assert_eq!(config.points, 5);
        assert_eq!(config.params, vec![4.0]);
        assert_eq!(config.output, PathBuf::from("t.csv"));
    }

    #[test]
    fn no_plot_and_no_reject_flags_map_to_config() {
        let cli = Cli::try_parse_from(["labfit", "tunnel", "--no-plot", "--no-reject"]).unwrap();
        let Command::Tunnel(args) = cli.command else {
            panic!("expected tunnel");
        };
        let config = tunnelling_config_from_args(&args);
        assert!(!config.output.plot);
        assert!(!config.reject_outliers);
        assert_eq!(config.data, PathBuf::from("Tunnelling_data_BN.csv"));
        assert_eq!(config.initial_d, 2.5);
    }
}
