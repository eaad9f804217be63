//! Nelder–Mead downhill simplex for derivative-free minimization.
//!
//! Conventions follow the classic `fmin` routine:
//! - initial simplex: each coordinate perturbed by 5 % (0.00025 when it is zero)
//! - convergence: simplex spread `<= x_tol` **and** objective spread `<= f_tol`
//!   (both absolute, infinity norm)
//! - default iteration and evaluation caps of `200 · n`

use tracing::{debug, warn};

use crate::error::AppError;
use crate::fit::objective::Minimum;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.00025;

/// Simplex settings.
#[derive(Debug, Clone)]
pub struct SimplexOptions {
    pub x_tol: f64,
    pub f_tol: f64,
    /// Defaults to `200 · n` when unset.
    pub max_iterations: Option<usize>,
    /// Defaults to `200 · n` when unset.
    pub max_evaluations: Option<usize>,
}

impl Default for SimplexOptions {
    fn default() -> Self {
        Self {
            x_tol: 1e-4,
            f_tol: 1e-4,
            max_iterations: None,
            max_evaluations: None,
        }
    }
}

/// Minimize `f` from `x0` with the Nelder–Mead simplex method.
pub fn nelder_mead<F>(f: F, x0: &[f64], opts: &SimplexOptions) -> Result<Minimum, AppError>
where
    F: Fn(&[f64]) -> f64,
{
    let n = x0.len();
    if n == 0 {
        return Err(AppError::input("nelder_mead: empty initial guess."));
    }
    if x0.iter().any(|v| !v.is_finite()) {
        return Err(AppError::input("nelder_mead: initial guess must be finite."));
    }

    let max_iterations = opts.max_iterations.unwrap_or(200 * n);
    let max_evaluations = opts.max_evaluations.unwrap_or(200 * n);

    // Initialize simplex with n+1 vertices.
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    simplex.extend((0..n).map(|i| {
        let mut vertex = x0.to_vec();
        if vertex[i] != 0.0 {
            vertex[i] *= 1.0 + NONZERO_DELTA;
        } else {
            vertex[i] = ZERO_DELTA;
        }
        vertex
    }));

    let mut values: Vec<f64> = simplex.iter().map(|v| f(v)).collect();
    let mut evaluations = n + 1;
    let mut iterations = 0usize;
    let mut converged = false;

    loop {
        sort_simplex(&mut simplex, &mut values);

        if has_converged(&simplex, &values, opts.x_tol, opts.f_tol) {
            converged = true;
            break;
        }
        if iterations >= max_iterations || evaluations >= max_evaluations {
            break;
        }
        iterations += 1;

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; n];
        for vertex in &simplex[..n] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v;
            }
        }
        for c in centroid.iter_mut() {
            *c /= n as f64;
        }

        let worst = simplex[n].clone();
        let x_r = affine(&centroid, &worst, -REFLECTION);
        let f_r = f(&x_r);
        evaluations += 1;

        if f_r < values[0] {
            let x_e = affine(&centroid, &worst, -REFLECTION * EXPANSION);
            let f_e = f(&x_e);
            evaluations += 1;

            if f_e < f_r {
                simplex[n] = x_e;
                values[n] = f_e;
            } else {
                simplex[n] = x_r;
                values[n] = f_r;
            }
            continue;
        }

        if f_r < values[n - 1] {
            simplex[n] = x_r;
            values[n] = f_r;
            continue;
        }

        let shrink = if f_r < values[n] {
            // Outside contraction.
            let x_c = affine(&centroid, &worst, -REFLECTION * CONTRACTION);
            let f_c = f(&x_c);
            evaluations += 1;
            if f_c <= f_r {
                simplex[n] = x_c;
                values[n] = f_c;
                false
            } else {
                true
            }
        } else {
            // Inside contraction.
            let x_cc = affine(&centroid, &worst, CONTRACTION);
            let f_cc = f(&x_cc);
            evaluations += 1;
            if f_cc < values[n] {
                simplex[n] = x_cc;
                values[n] = f_cc;
                false
            } else {
                true
            }
        };

        if shrink {
            let (best, rest) = simplex.split_at_mut(1);
            for (vertex, value) in rest.iter_mut().zip(values[1..].iter_mut()) {
                for (v, b) in vertex.iter_mut().zip(&best[0]) {
                    *v = b + SHRINK * (*v - b);
                }
                *value = f(vertex.as_slice());
                evaluations += 1;
            }
        }
    }

    if !converged {
        warn!(
            iterations,
            evaluations,
            objective = values[0],
            "simplex stopped at its iteration/evaluation cap before converging"
        );
    }
    debug!(iterations, evaluations, objective = values[0], "simplex finished");

    Ok(Minimum {
        x: simplex[0].clone(),
        fun: values[0],
        iterations,
        evaluations,
        converged,
    })
}

/// `centroid + coeff · (centroid - worst)`, negated coefficient convention:
/// `coeff = -1` reflects, `-2` expands, `-0.5` contracts outside, `0.5` inside.
fn affine(centroid: &[f64], worst: &[f64], coeff: f64) -> Vec<f64> {
    centroid
        .iter()
        .zip(worst.iter())
        .map(|(&c, &w)| c - coeff * (c - w))
        .collect()
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    // Stable sort keeps the earlier vertex first on ties (deterministic).
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

fn has_converged(simplex: &[Vec<f64>], values: &[f64], x_tol: f64, f_tol: f64) -> bool {
    let best = &simplex[0];
    let x_spread = simplex[1..]
        .iter()
        .flat_map(|v| v.iter().zip(best.iter()).map(|(a, b)| (a - b).abs()))
        .fold(0.0_f64, f64::max);
    let f_spread = values[1..]
        .iter()
        .map(|v| (v - values[0]).abs())
        .fold(0.0_f64, f64::max);
    // NaN spreads (infinite objective values) never count as converged.
    x_spread <= x_tol && f_spread <= f_tol
}
