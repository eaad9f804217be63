//! Export per-observation residuals to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::path::Path;

use serde::Serialize;

use crate::domain::ObservationResidual;
use crate::error::{AppError, EXIT_OUTPUT};

#[derive(Debug, Serialize)]
struct ResidualRow {
    x: f64,
    y_obs: f64,
    sigma: f64,
    y_fit: f64,
    residual: f64,
    pull: f64,
    rejected: bool,
}

/// Write kept and rejected residuals to a CSV file, kept rows first.
pub fn write_residuals_csv(
    path: &Path,
    kept: &[ObservationResidual],
    rejected: &[ObservationResidual],
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to create residuals CSV '{}': {e}", path.display()),
        )
    })?;

    let rows = kept
        .iter()
        .map(|r| (r, false))
        .chain(rejected.iter().map(|r| (r, true)));

    for (r, rejected) in rows {
        writer
            .serialize(ResidualRow {
                x: r.obs.x,
                y_obs: r.obs.y,
                sigma: r.obs.sigma,
                y_fit: r.y_fit,
                residual: r.residual,
                pull: r.pull,
                rejected,
            })
            .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to write residuals CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to write residuals CSV: {e}")))?;
    Ok(())
}
