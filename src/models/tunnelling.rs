//! Electron tunnelling through a thin boron nitride barrier.
//!
//! The barrier is modelled as a rectangular potential `V₀` reduced by the image
//! potential. Over the classically forbidden region `[d₁, d₂]` the averaged
//! barrier height is
//!
//! ```text
//! V̄ = V₀ - 1.15 ln2 / (8π ε_r ε₀ (d₂ - d₁)) · ln(d₂ (d - d₁) / (d₁ (d - d₂)))
//! ```
//!
//! and the transmission probability at electron energy `E` (eV) is
//!
//! ```text
//! T(E; d) = exp(-2 (d₂ - d₁) · √(2m)/ħ · √(V̄ - E))
//! ```
//!
//! Lengths are in Ångström, energies in eV.

use std::f64::consts::{LN_2, PI};

/// `√(2m)/ħ` in eV^-1/2 Å^-1.
pub const SQRT_2M_OVER_HBAR: f64 = 0.512317;
/// Vacuum permittivity in e² eV^-1 Å^-1.
pub const VACUUM_PERMITTIVITY: f64 = 0.00553;
/// Barrier height in eV.
pub const BARRIER_HEIGHT: f64 = 3.0;
/// Relative permittivity of boron nitride.
pub const RELATIVE_PERMITTIVITY: f64 = 4.0;
/// Thickness of one BN layer in Å.
pub const LAYER_THICKNESS: f64 = 3.0;

/// Inner turning point `d₁` (independent of `d`).
pub fn inner_turning_point() -> f64 {
    (1.2 * LN_2) / (8.0 * PI * RELATIVE_PERMITTIVITY * VACUUM_PERMITTIVITY * BARRIER_HEIGHT)
}

/// Average barrier height `V̄` for a barrier of thickness `d`.
///
/// Returns NaN when `d` is too thin for a forbidden region to exist.
pub fn average_potential(d: f64) -> f64 {
    let d1 = inner_turning_point();
    let d2 = d - d1;
    let width = d2 - d1;
    let image = 1.15 * LN_2 / (8.0 * PI * RELATIVE_PERMITTIVITY * VACUUM_PERMITTIVITY);
    BARRIER_HEIGHT - (image / width) * ((d2 * (d - d1)) / (d1 * (d - d2))).ln()
}

/// Transmission coefficient at energy `energy` through thickness `d`.
///
/// NaN when `energy` exceeds the average barrier (`V̄ - E < 0`); the fitter
/// treats such parameter values as infinitely bad.
pub fn transmission(energy: f64, d: f64) -> f64 {
    let d1 = inner_turning_point();
    let width = (d - d1) - d1;
    let v_bar = average_potential(d);
    (-2.0 * width * SQRT_2M_OVER_HBAR * (v_bar - energy).sqrt()).exp()
}

/// Number of BN layers in a barrier of thickness `d`.
pub fn layer_count(d: f64) -> f64 {
    d / LAYER_THICKNESS
}
