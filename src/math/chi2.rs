//! Chi-squared goodness-of-fit statistics.
//!
//! ```text
//! χ² = Σ ((y_i - ŷ_i) / σ_i)²
//! χ²_ν = χ² / (N - k)
//! ```

use crate::domain::Observation;
use crate::error::AppError;

/// Chi-squared of a model closure evaluated at each observation's `x`.
pub fn chi_squared_with<F>(obs: &[Observation], model: F) -> f64
where
    F: Fn(f64) -> f64,
{
    obs.iter()
        .map(|o| {
            let pull = (o.y - model(o.x)) / o.sigma;
            pull * pull
        })
        .sum()
}

/// Degrees of freedom `N - k`.
pub fn degrees_of_freedom(n: usize, k: usize) -> Result<usize, AppError> {
    if n <= k {
        return Err(AppError::new(
            crate::error::EXIT_NO_DATA,
            format!("Not enough observations for a fit: n={n} with k={k} free parameters."),
        ));
    }
    Ok(n - k)
}

/// Reduced chi-squared `χ² / (N - k)`.
pub fn reduced_chi_squared(chi2: f64, n: usize, k: usize) -> Result<f64, AppError> {
    let dof = degrees_of_freedom(n, k)?;
    Ok(chi2 / dof as f64)
}
