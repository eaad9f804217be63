//! Chi-squared surface over two parameters and its confidence contours.
//!
//! The surface is sampled on a rectangular grid (rows in parallel) and
//! iso-lines are extracted at `χ²_min + Δχ²` with marching squares. The
//! deltas are the usual joint/marginal confidence levels for two parameters.

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{ModelKind, Observation};
use crate::fit::objective::chi_squared_objective;

/// `Δχ²` above the minimum for each drawn contour.
pub const CONFIDENCE_DELTAS: [f64; 4] = [1.00, 2.30, 5.99, 9.21];

/// Window half-width (fraction of the value) used when a parameter has no
/// usable uncertainty.
const FALLBACK_HALF_WIDTH: f64 = 0.2;

/// A straight piece of an iso-line, in parameter coordinates.
pub type Segment = [(f64, f64); 2];

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![start];
    }
    (0..n)
        .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
        .collect()
}

/// Parameter window `best ± sigmas · error` for one axis.
///
/// Falls back to `±20 %` of the value when the error is NaN or zero.
pub fn contour_window(best: f64, error: f64, sigmas: f64) -> (f64, f64) {
    let half = if error.is_finite() && error > 0.0 {
        sigmas * error
    } else {
        FALLBACK_HALF_WIDTH * best.abs()
    };
    (best - half, best + half)
}

/// Sampled chi-squared values; `values[j][i]` is taken at `(xs[i], ys[j])`.
#[derive(Debug, Clone, Serialize)]
pub struct ChiSquaredSurface {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl ChiSquaredSurface {
    /// Evaluate chi-squared of a two-parameter `model` on the grid `xs × ys`.
    pub fn compute(model: ModelKind, obs: &[Observation], xs: &[f64], ys: &[f64]) -> Self {
        let objective = chi_squared_objective(model, obs);
        let values = ys
            .par_iter()
            .map(|&y| xs.iter().map(|&x| objective(&[x, y])).collect())
            .collect();
        Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            values,
        }
    }

    /// Smallest finite sampled value.
    pub fn min_value(&self) -> Option<f64> {
        self.values
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .min_by(f64::total_cmp)
    }
}

/// One iso-line of the surface.
#[derive(Debug, Clone, Serialize)]
pub struct ContourLevel {
    pub delta: f64,
    pub level: f64,
    pub segments: Vec<Segment>,
}

/// Contours at `chi2_min + Δ` for every entry of [`CONFIDENCE_DELTAS`].
pub fn confidence_contours(surface: &ChiSquaredSurface, chi2_min: f64) -> Vec<ContourLevel> {
    CONFIDENCE_DELTAS
        .iter()
        .map(|&delta| {
            let level = chi2_min + delta;
            ContourLevel {
                delta,
                level,
                segments: marching_squares(surface, level),
            }
        })
        .collect()
}

/// Iso-line segments of `surface` at `level`.
///
/// Cells with a non-finite corner are skipped. Saddle cells are resolved with
/// the cell-centre average.
pub fn marching_squares(surface: &ChiSquaredSurface, level: f64) -> Vec<Segment> {
    let (xs, ys, v) = (&surface.xs, &surface.ys, &surface.values);
    let mut segments = Vec::new();
    if xs.len() < 2 || ys.len() < 2 {
        return segments;
    }

    for j in 0..ys.len() - 1 {
        for i in 0..xs.len() - 1 {
            // Corners counter-clockwise from bottom-left.
            let corners = [
                (xs[i], ys[j], v[j][i]),
                (xs[i + 1], ys[j], v[j][i + 1]),
                (xs[i + 1], ys[j + 1], v[j + 1][i + 1]),
                (xs[i], ys[j + 1], v[j + 1][i]),
            ];
            if corners.iter().any(|c| !c.2.is_finite()) {
                continue;
            }

            let mut case = 0u8;
            for (bit, c) in corners.iter().enumerate() {
                if c.2 >= level {
                    case |= 1 << bit;
                }
            }

            // Edge k joins corner k and corner (k + 1) % 4.
            let edge = |k: usize| crossing(corners[k], corners[(k + 1) % 4], level);

            let pairs: &[(usize, usize)] = match case {
                0 | 15 => &[],
                1 | 14 => &[(3, 0)],
                2 | 13 => &[(0, 1)],
                3 | 12 => &[(3, 1)],
                4 | 11 => &[(1, 2)],
                6 | 9 => &[(0, 2)],
                7 | 8 => &[(2, 3)],
                5 | 10 => {
                    let centre = corners.iter().map(|c| c.2).sum::<f64>() / 4.0;
                    let centre_high = centre >= level;
                    // Corners 0 and 2 are high in case 5.
                    if (case == 5) == centre_high {
                        &[(0, 1), (2, 3)]
                    } else {
                        &[(3, 0), (1, 2)]
                    }
                }
                _ => &[],
            };

            for &(a, b) in pairs {
                segments.push([edge(a), edge(b)]);
            }
        }
    }

    segments
}

fn crossing(a: (f64, f64, f64), b: (f64, f64, f64), level: f64) -> (f64, f64) {
    let dv = b.2 - a.2;
    let t = if dv == 0.0 { 0.5 } else { ((level - a.2) / dv).clamp(0.0, 1.0) };
    (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
}
