//! Fit summary JSON export.
//!
//! A summary is the portable record of one run:
//! - model kind, strategy, parameter names, values and errors
//! - fit quality (χ², reduced χ², n, k, rejected count)
//! - derived physical quantities (layer count, half-lives)
//! - provenance (data files, row counts, UTC timestamp)

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DerivedQuantity, FitQuality, FitResult, FitStrategy, ModelKind};
use crate::error::{AppError, EXIT_OUTPUT};
use crate::io::ingest::IngestedData;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub model: ModelKind,
    pub strategy: FitStrategy,
    pub param_names: Vec<String>,
    pub params: Vec<f64>,
    /// `None` where the uncertainty could not be estimated.
    pub errors: Vec<Option<f64>>,
    pub quality: FitQuality,
    pub derived: Vec<DerivedQuantity>,
    pub sources: Vec<PathBuf>,
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_invalid: usize,
}

impl FitSummary {
    pub fn new(result: &FitResult, derived: &[DerivedQuantity], ingest: &IngestedData) -> Self {
        Self {
            tool: "labfit".to_string(),
            generated_at: Utc::now(),
            model: result.model,
            strategy: result.strategy,
            param_names: result.model.param_names().iter().map(|s| s.to_string()).collect(),
            params: result.params.clone(),
            errors: result.errors.iter().map(|e| e.is_finite().then_some(*e)).collect(),
            quality: result.quality.clone(),
            derived: derived.to_vec(),
            sources: ingest.sources.clone(),
            rows_read: ingest.rows_read,
            rows_used: ingest.rows_used,
            rows_invalid: ingest.row_errors.len(),
        }
    }
}

/// Write a summary JSON file.
pub fn write_summary_json(path: &Path, summary: &FitSummary) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(
            EXIT_OUTPUT,
            format!("Failed to create summary JSON '{}': {e}", path.display()),
        )
    })?;

    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(EXIT_OUTPUT, format!("Failed to write summary JSON: {e}")))?;

    Ok(())
}
