//! Mathematical utilities: chi-squared statistics and small linear algebra.

pub mod chi2;
pub mod linalg;

pub use chi2::*;
pub use linalg::*;
