//! Fixed-step hill climbing.
//!
//! Starting from the initial guess, each iteration evaluates the objective at
//! `x ± step` along every parameter axis (axis order, `+step` before `-step`)
//! and moves to the first neighbour that improves on the current value.
//!
//! The search stops when:
//! - no neighbour improves (local minimum at this step size), or
//! - the improvement of the last move is `<= tolerance`, or
//! - `max_iterations` moves have been made (reported as not converged).
//!
//! The search is deterministic: no randomness, no parallelism.

use tracing::{debug, warn};

use crate::error::AppError;
use crate::fit::objective::Minimum;

/// Hill-climbing settings.
#[derive(Debug, Clone)]
pub struct HillClimbOptions {
    /// Step per parameter axis.
    pub steps: Vec<f64>,
    /// Stop once a move improves the objective by no more than this.
    pub tolerance: f64,
    pub max_iterations: usize,
}

/// Minimize `f` from `x0` by fixed-step hill climbing.
pub fn hill_climb<F>(f: F, x0: &[f64], opts: &HillClimbOptions) -> Result<Minimum, AppError>
where
    F: Fn(&[f64]) -> f64,
{
    if x0.is_empty() {
        return Err(AppError::input("hill climb: empty initial guess."));
    }
    if opts.steps.len() != x0.len() {
        return Err(AppError::input(format!(
            "hill climb: {} step sizes given for {} parameters.",
            opts.steps.len(),
            x0.len()
        )));
    }
    if opts.steps.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
        return Err(AppError::input("hill climb: step sizes must be finite and > 0."));
    }
    if !(opts.tolerance.is_finite() && opts.tolerance >= 0.0) {
        return Err(AppError::input("hill climb: tolerance must be finite and >= 0."));
    }

    let mut x = x0.to_vec();
    let mut current = f(&x);
    let mut evaluations = 1usize;
    let mut iterations = 0usize;
    let mut converged = true;

    // The first comparison is against the objective itself, so a search that
    // starts exactly on a perfect fit never moves.
    let mut difference = current;

    while difference > opts.tolerance {
        if iterations >= opts.max_iterations {
            warn!(
                iterations,
                objective = current,
                "hill climb stopped at the iteration cap before converging"
            );
            converged = false;
            break;
        }

        let Some((next, value)) = first_improving_neighbour(&f, &x, current, &opts.steps, &mut evaluations)
        else {
            break;
        };

        difference = current - value;
        x = next;
        current = value;
        iterations += 1;
    }

    debug!(iterations, evaluations, objective = current, "hill climb finished");

    Ok(Minimum {
        x,
        fun: current,
        iterations,
        evaluations,
        converged,
    })
}

fn first_improving_neighbour<F>(
    f: &F,
    x: &[f64],
    current: f64,
    steps: &[f64],
    evaluations: &mut usize,
) -> Option<(Vec<f64>, f64)>
where
    F: Fn(&[f64]) -> f64,
{
    for (axis, &step) in steps.iter().enumerate() {
        for direction in [1.0, -1.0] {
            let mut candidate = x.to_vec();
            candidate[axis] += direction * step;
            let value = f(&candidate);
            *evaluations += 1;
            if current > value {
                return Some((candidate, value));
            }
        }
    }
    None
}
