//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - rejected outliers: `x`
//! - fitted curve: `-` line

use crate::domain::{ModelKind, Observation};
use crate::models::predict_all;
use crate::report::fmt_sig;

/// Render observations, rejected points and the fitted curve.
pub fn render_fit_plot(
    kept: &[Observation],
    rejected: &[Observation],
    model: ModelKind,
    params: &[f64],
    width: usize,
    height: usize,
) -> String {
    let points: Vec<(f64, f64)> = kept.iter().map(|o| (o.x, o.y)).collect();
    let outliers: Vec<(f64, f64)> = rejected.iter().map(|o| (o.x, o.y)).collect();

    let (x_min, x_max) = x_range(points.iter().chain(outliers.iter())).unwrap_or((0.0, 1.0));
    let xs: Vec<f64> = (0..width.max(2))
        .map(|i| x_min + (x_max - x_min) * i as f64 / (width.max(2) as f64 - 1.0))
        .collect();
    let curve: Vec<(f64, f64)> = xs
        .iter()
        .copied()
        .zip(predict_all(model, &xs, params))
        .filter(|(_, y)| y.is_finite())
        .collect();

    render_plot(&points, &outliers, Some(&curve), x_min, x_max, width, height)
}

/// Render a polyline through `points` with each point marked.
pub fn render_series_plot(points: &[(f64, f64)], width: usize, height: usize) -> String {
    let (x_min, x_max) = x_range(points.iter()).unwrap_or((0.0, 1.0));
    render_plot(points, &[], Some(points), x_min, x_max, width, height)
}

fn render_plot(
    points: &[(f64, f64)],
    outliers: &[(f64, f64)],
    curve_points: Option<&[(f64, f64)]>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    // Determine y-range from observed points and curve points.
    let (y_min, y_max) = y_range(points.iter().chain(outliers.iter()), curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    for (marks, ch) in [(points, 'o'), (outliers, 'x')] {
        for &(px, py) in marks {
            let x = map_x(px, x_min, x_max, width);
            let y = map_y(py, y_min, y_max, height);
            grid[y][x] = ch;
        }
    }

    // Build final string. We include a small header with ranges.
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{}, {}] | y=[{}, {}]\n",
        fmt_sig(x_min, 4),
        fmt_sig(x_max, 4),
        fmt_sig(y_min, 4),
        fmt_sig(y_max, 4)
    ));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    out
}

fn x_range<'a>(points: impl Iterator<Item = &'a (f64, f64)>) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range<'a>(
    points: impl Iterator<Item = &'a (f64, f64)>,
    curve: Option<&'a [(f64, f64)]>,
) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.chain(curve.unwrap_or_default().iter()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let xx = map_x(x, x_min, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, xx, yy, '-');
        } else {
            grid[yy][xx] = '-';
        }
        prev = Some((xx, yy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        let inside = y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len();
        if inside && grid[y0 as usize][x0 as usize] == ' ' {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_golden_snapshot_small() {
        let points = [(1.0, 100.0), (10.0, 110.0)];
        let curve = [(1.0, 100.0), (10.0, 100.0)];

        let txt = render_plot(&points, &[], Some(&curve), 1.0, 10.0, 10, 5);
        let expected = concat!(
            "Plot: x=[1, 10] | y=[99.5, 110.5]\n",
            "         o\n",
            "\n",
            "\n",
            "\n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn rejected_points_are_marked_x() {
        let kept = [Observation::new(0.0, 0.05, 0.01), Observation::new(0.3, 0.06, 0.01)];
        let rejected = [Observation::new(0.15, 0.5, 0.01)];
        let txt = render_fit_plot(&kept, &rejected, ModelKind::Tunnelling, &[4.0], 20, 8);

        let body: Vec<&str> = txt.lines().skip(1).collect();
        assert_eq!(body.len(), 8);
        // The outlier is the highest value, so it sits on the top row.
        assert!(body[0].contains('x'));
        let marks: usize = body.iter().map(|row| row.matches('o').count()).sum();
        assert_eq!(marks, 2);
        assert!(body.iter().any(|row| row.contains('-')));
    }

    #[test]
    fn series_plot_marks_every_point() {
        let pts = [(0.0, 10.0), (1.0, 5.0), (2.0, 2.5)];
        let txt = render_series_plot(&pts, 12, 6);
        let marks: usize = txt.lines().skip(1).map(|row| row.matches('o').count()).sum();
        assert_eq!(marks, 3);
    }
}
