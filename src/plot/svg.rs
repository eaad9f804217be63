//! SVG charts written with Plotters.
//!
//! Every chart is data-driven: series and bounds are computed before any
//! drawing, so the drawing code only maps them onto the backend.
//!
//! Charts:
//! - data with error bars + fitted curve (+ rejected outliers)
//! - chi-squared confidence contours around the minimum
//! - bounce apex heights against cumulative time

use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::domain::{ModelKind, Observation};
use crate::error::{AppError, EXIT_OUTPUT};
use crate::fit::contour::ContourLevel;
use crate::models::predict_all;

const DATA_COLOR: RGBColor = RGBColor(0x30, 0xB2, 0x6B);
const CURVE_COLOR: RGBColor = RGBColor(0xB9, 0x00, 0x76);
const OUTLIER_COLOR: RGBColor = RGBColor(0xE0, 0x40, 0x20);
const MINIMUM_COLOR: RGBColor = RGBColor(0x1F, 0x77, 0xB4);
const CONTOUR_COLORS: [RGBColor; 4] = [
    RGBColor(0x00, 0x81, 0x3B),
    RGBColor(0x00, 0x9B, 0xFF),
    RGBColor(0x36, 0x00, 0xFF),
    RGBColor(0xFF, 0x00, 0xD8),
];

/// Samples along the fitted curve.
const CURVE_SAMPLES: usize = 400;

type DrawResult = Result<(), Box<dyn Error>>;

/// Title and axis descriptions for one chart.
#[derive(Debug, Clone, Copy)]
pub struct ChartText<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
}

/// Pixel size of the written SVG.
#[derive(Debug, Clone, Copy)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width: 900,
            height: 600,
        }
    }
}

/// Observations with error bars, rejected points and the fitted curve.
pub fn draw_fit_chart(
    path: &Path,
    kept: &[Observation],
    rejected: &[Observation],
    model: ModelKind,
    params: &[f64],
    text: ChartText<'_>,
    size: ChartSize,
) -> Result<(), AppError> {
    let (x0, x1) = padded(kept.iter().chain(rejected).flat_map(|o| [o.x]))
        .ok_or_else(|| AppError::new(EXIT_OUTPUT, "Nothing to plot."))?;

    let xs: Vec<f64> = (0..CURVE_SAMPLES)
        .map(|i| x0 + (x1 - x0) * i as f64 / (CURVE_SAMPLES - 1) as f64)
        .collect();
    let curve: Vec<(f64, f64)> = xs
        .iter()
        .copied()
        .zip(predict_all(model, &xs, params))
        .filter(|(_, y)| y.is_finite())
        .collect();

    let ys = kept
        .iter()
        .chain(rejected)
        .flat_map(|o| [o.y - o.sigma, o.y + o.sigma])
        .chain(curve.iter().map(|p| p.1));
    let (y0, y1) = padded(ys).ok_or_else(|| AppError::new(EXIT_OUTPUT, "Nothing to plot."))?;

    let draw = || -> DrawResult {
        let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(text.title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(80)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc(text.x_desc)
            .y_desc(text.y_desc)
            .y_label_formatter(&|v| format!("{v:.3e}"))
            .draw()?;

        chart
            .draw_series(
                kept.iter()
                    .map(|o| ErrorBar::new_vertical(o.x, o.y - o.sigma, o.y, o.y + o.sigma, DATA_COLOR.filled(), 6)),
            )?
            .label("Data")
            .legend(|(x, y)| Cross::new((x, y), 4, DATA_COLOR));

        if !rejected.is_empty() {
            chart
                .draw_series(rejected.iter().map(|o| Cross::new((o.x, o.y), 5, OUTLIER_COLOR.stroke_width(2))))?
                .label("Rejected (> 3σ)")
                .legend(|(x, y)| Cross::new((x, y), 4, OUTLIER_COLOR));
        }

        chart
            .draw_series(LineSeries::new(curve.iter().copied(), CURVE_COLOR.stroke_width(2)))?
            .label("Minimised chi squared line")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], CURVE_COLOR));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    };

    draw().map_err(|e| output_error(path, e))
}

/// Confidence contours with the minimum marked.
pub fn draw_contour_chart(
    path: &Path,
    levels: &[ContourLevel],
    best: (f64, f64),
    x_range: (f64, f64),
    y_range: (f64, f64),
    text: ChartText<'_>,
    size: ChartSize,
) -> Result<(), AppError> {
    let draw = || -> DrawResult {
        let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(text.title, ("sans-serif", 22))
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(80)
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;

        chart
            .configure_mesh()
            .x_desc(text.x_desc)
            .y_desc(text.y_desc)
            .x_label_formatter(&|v| format!("{v:.3e}"))
            .y_label_formatter(&|v| format!("{v:.3e}"))
            .draw()?;

        chart
            .draw_series(std::iter::once(Circle::new(best, 4, MINIMUM_COLOR.filled())))?
            .label("Minimum")
            .legend(|(x, y)| Circle::new((x, y), 4, MINIMUM_COLOR.filled()));

        for (level, color) in levels.iter().zip(CONTOUR_COLORS.iter().cycle()) {
            let color = *color;
            chart
                .draw_series(
                    level
                        .segments
                        .iter()
                        .map(move |s| PathElement::new(vec![s[0], s[1]], color.stroke_width(2))),
                )?
                .label(format!("χ²min + {:.2}", level.delta))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    };

    draw().map_err(|e| output_error(path, e))
}

/// Apex height against cumulative time for a bouncing ball.
pub fn draw_bounce_chart(path: &Path, series: &[(f64, f64)], size: ChartSize) -> Result<(), AppError> {
    let (x0, x1) = padded(series.iter().map(|p| p.0).chain(std::iter::once(0.0)))
        .ok_or_else(|| AppError::new(EXIT_OUTPUT, "Nothing to plot."))?;
    let (y0, y1) = padded(series.iter().map(|p| p.1).chain(std::iter::once(0.0)))
        .ok_or_else(|| AppError::new(EXIT_OUTPUT, "Nothing to plot."))?;

    let draw = || -> DrawResult {
        let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                "The decay of maximum bounce height for the ball against time",
                ("sans-serif", 20),
            )
            .margin(15)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .y_desc("Maximum Height (m)")
            .draw()?;

        chart.draw_series(LineSeries::new(series.iter().copied(), CURVE_COLOR.stroke_width(2)))?;
        chart.draw_series(series.iter().map(|&p| Circle::new(p, 3, DATA_COLOR.filled())))?;

        root.present()?;
        Ok(())
    };

    draw().map_err(|e| output_error(path, e))
}

fn output_error(path: &Path, e: Box<dyn Error>) -> AppError {
    AppError::new(EXIT_OUTPUT, format!("Failed to write plot '{}': {e}", path.display()))
}

/// Range of `values` padded by 5 % on both sides.
fn padded(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let span = hi - lo;
    let pad = if span > 0.0 { 0.05 * span } else { lo.abs().max(1.0) * 0.05 };
    Some((lo - pad, hi + pad))
}
