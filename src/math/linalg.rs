//! Small dense linear algebra helpers on top of nalgebra.
//!
//! The fitter solves tiny (1×1, 2×2) systems:
//!
//! - the damped normal equations of a Levenberg–Marquardt step
//! - the inverse of `JᵀJ` for the parameter covariance
//!
//! Implementation choices:
//! - SVD for the linear solve, so nearly singular systems still produce a
//!   usable step instead of a panic.
//! - Covariance via a direct inverse, falling back to the pseudo-inverse when
//!   the matrix is singular (one parameter unconstrained by the data).

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Covariance `(JᵀJ)⁻¹` for a Jacobian of sigma-normalized residuals.
pub fn covariance_from_jacobian(jacobian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let jtj = jacobian.transpose() * jacobian;
    let cov = match jtj.clone().try_inverse() {
        Some(inv) => inv,
        None => jtj.pseudo_inverse(1e-12).ok()?,
    };
    if cov.iter().all(|v| v.is_finite()) {
        Some(cov)
    } else {
        None
    }
}

/// 1σ errors: square roots of the covariance diagonal.
///
/// Negative diagonal entries (numerical noise) map to NaN.
pub fn standard_errors(cov: &DMatrix<f64>) -> Vec<f64> {
    cov.diagonal()
        .iter()
        .map(|&v| if v >= 0.0 { v.sqrt() } else { f64::NAN })
        .collect()
}
