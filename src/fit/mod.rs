//! Fit engine.
//!
//! Responsibilities:
//!
//! - minimize chi-squared (hill climbing or Nelder–Mead simplex)
//! - reject 3σ outliers once and refit
//! - estimate parameter errors (Levenberg–Marquardt covariance)
//! - sample the chi-squared surface and extract confidence contours

pub mod contour;
pub mod curve_fit;
pub mod fitter;
pub mod hill_climb;
pub mod objective;
pub mod simplex;

pub use fitter::*;
pub use objective::Minimum;
