//! Two-step decay chain `Sr-79 → Rb-79 → Kr-79`.
//!
//! The sample starts as pure Sr-79 (`N_Sr(0) = 1 µmol`). The Rb-79 population
//! grows from Sr decay and decays itself, so the measured Rb activity is
//!
//! ```text
//! A(t) = λ_Rb · N_Sr(0) · λ_Sr / (λ_Rb - λ_Sr) · (e^{-λ_Sr t} - e^{-λ_Rb t})
//! ```
//!
//! Time in seconds, activity in Bq, decay constants in s⁻¹.

use std::f64::consts::LN_2;

pub const AVOGADRO: f64 = 6.022_140_76e23;
/// Initial Sr-79 population (1 µmol).
pub const INITIAL_SR_ATOMS: f64 = 1e-6 * AVOGADRO;
pub const SECONDS_PER_MINUTE: f64 = 60.0;

/// Rb-79 activity at time `t`.
///
/// Undefined (NaN/inf) when both decay constants are equal.
pub fn activity(t: f64, lambda_rb: f64, lambda_sr: f64) -> f64 {
    let n_rb = INITIAL_SR_ATOMS * (lambda_sr / (lambda_rb - lambda_sr))
        * ((-lambda_sr * t).exp() - (-lambda_rb * t).exp());
    lambda_rb * n_rb
}

/// Half-life `ln2 / λ` in the reciprocal unit of `lambda`.
pub fn half_life(lambda: f64) -> f64 {
    LN_2 / lambda
}

/// Propagated 1σ error on [`half_life`]: `ln2 / λ² · σ_λ`.
pub fn half_life_error(lambda: f64, lambda_error: f64) -> f64 {
    LN_2 / (lambda * lambda) * lambda_error
}
