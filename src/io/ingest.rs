//! CSV ingest and validation.
//!
//! This module turns one or more three-column measurement files into a clean
//! set of `(x, y, σ)` observations that are safe to fit.
//!
//! Design goals:
//! - **Fail early** on files that cannot be opened (exit code 2, before any
//!   computation)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (stable ordering, no hidden randomness)
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::{DatasetSpec, Observation};
use crate::error::{AppError, EXIT_NO_DATA};

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// Source file, filled in by [`load_observation_set`].
    pub file: Option<PathBuf>,
    /// 1-based line number within the file.
    pub line: usize,
    pub message: String,
}

/// Result of parsing a single reader.
#[derive(Debug, Clone, Default)]
pub struct ParsedRows {
    pub observations: Vec<Observation>,
    pub row_errors: Vec<RowError>,
    /// Data rows seen after the skipped header lines.
    pub rows_read: usize,
}

/// Summary stats about the observations actually used for fitting.
#[derive(Debug, Clone, Copy)]
pub struct DatasetStats {
    pub n_points: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Ingest output: observations + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Vec<Observation>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    pub sources: Vec<PathBuf>,
}

/// Parse three-field records from `reader` according to `spec`.
///
/// Never fails: unreadable, short, non-numeric or out-of-domain rows are
/// returned as [`RowError`]s and the remaining rows are kept.
pub fn parse_observations<R: Read>(reader: R, spec: &DatasetSpec) -> ParsedRows {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut parsed = ParsedRows::default();

    for (idx, result) in csv_reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
                if line > spec.skip_header {
                    parsed.rows_read += 1;
                    parsed.row_errors.push(RowError {
                        file: None,
                        line,
                        message: format!("CSV parse error: {e}"),
                    });
                }
                continue;
            }
        };

        let line = record.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
        if line <= spec.skip_header {
            continue;
        }
        parsed.rows_read += 1;

        match parse_row(&record, spec) {
            Ok(obs) => parsed.observations.push(obs),
            Err(message) => parsed.row_errors.push(RowError {
                file: None,
                line,
                message,
            }),
        }
    }

    parsed
}

fn parse_row(record: &csv::StringRecord, spec: &DatasetSpec) -> Result<Observation, String> {
    if record.len() < 3 {
        return Err(format!("Expected 3 fields, found {}.", record.len()));
    }

    let mut fields = [0.0_f64; 3];
    for (i, slot) in fields.iter_mut().enumerate() {
        let raw = record.get(i).unwrap_or_default();
        *slot = raw
            .parse::<f64>()
            .map_err(|_| format!("Field {} is not a number: {raw:?}.", i + 1))?;
    }

    if let Some(bad) = fields.iter().find(|v| !spec.domain.contains(**v)) {
        return Err(format!("Value {bad} is outside the valid range ({:?}).", spec.domain));
    }

    let obs = spec.layout.arrange(fields);
    let obs = Observation::new(obs.x * spec.x_scale, obs.y * spec.y_scale, obs.sigma * spec.y_scale);
    if obs.sigma == 0.0 {
        return Err("Zero uncertainty.".to_string());
    }
    Ok(obs)
}

/// Load, validate and concatenate observations from every file in `paths`.
///
/// All files are opened before any parsing; a missing file is an input error
/// (exit code 2). With more than one file, the result is stable-sorted by `x`.
pub fn load_observation_set(paths: &[PathBuf], spec: &DatasetSpec) -> Result<IngestedData, AppError> {
    if paths.is_empty() {
        return Err(AppError::input("No data files given."));
    }

    let files = paths
        .iter()
        .map(|p| open_data_file(p).map(|f| (p, f)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut observations = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (path, file) in files {
        let parsed = parse_observations(file, spec);
        debug!(
            file = %path.display(),
            rows = parsed.rows_read,
            kept = parsed.observations.len(),
            "parsed data file"
        );
        rows_read += parsed.rows_read;
        observations.extend(parsed.observations);
        for mut err in parsed.row_errors {
            warn!(file = %path.display(), line = err.line, reason = %err.message, "invalid data, line removed");
            err.file = Some(path.clone());
            row_errors.push(err);
        }
    }

    if paths.len() > 1 {
        observations.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    let stats = compute_stats(&observations).ok_or_else(|| {
        AppError::new(EXIT_NO_DATA, "No valid rows remain after validation.")
    })?;

    Ok(IngestedData {
        rows_used: observations.len(),
        observations,
        stats,
        row_errors,
        rows_read,
        sources: paths.to_vec(),
    })
}

fn open_data_file(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::input(format!("Could not open file '{}': {e}", path.display())))
}

fn compute_stats(obs: &[Observation]) -> Option<DatasetStats> {
    if obs.is_empty() {
        return None;
    }
    let mut stats = DatasetStats {
        n_points: obs.len(),
        x_min: f64::INFINITY,
        x_max: f64::NEG_INFINITY,
        y_min: f64::INFINITY,
        y_max: f64::NEG_INFINITY,
    };
    for o in obs {
        stats.x_min = stats.x_min.min(o.x);
        stats.x_max = stats.x_max.max(o.x);
        stats.y_min = stats.y_min.min(o.y);
        stats.y_max = stats.y_max.max(o.y);
    }
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::domain::{BQ_PER_TBQ, SECONDS_PER_HOUR};

    #[test]
    fn header_and_one_bad_row() {
        let csv = "T,E,dT\n0.5,0.1,0.01\nabc,0.2,0.01\n0.6,0.3,0.02\n";
        let parsed = parse_observations(csv.as_bytes(), &DatasetSpec::tunnelling());
        assert_eq!(parsed.rows_read, 3);
        assert_eq!(parsed.observations.len(), 2);
        assert_eq!(parsed.row_errors.len(), 1);
        assert_eq!(parsed.row_errors[0].line, 3);
        // Tunnelling files are `T, E, σ`: energy is the independent variable.
        assert_eq!(parsed.observations[0], Observation::new(0.1, 0.5, 0.01));
    }

    #[test]
    fn unit_interval_domain_drops_out_of_range_rows() {
        let csv = "h\n0.5,0.1,0.01\n1.5,0.1,0.01\n0.5,-0.1,0.01\n0.5,0.2,0.0\n";
        let parsed = parse_observations(csv.as_bytes(), &DatasetSpec::tunnelling());
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.row_errors.len(), 3);
    }

    #[test]
    fn decay_rows_are_scaled_and_zeros_dropped() {
        let csv = "t,A,dA\n0.5,0.2,0.01\n1.0,0,0.01\n1.5,nan,0.01\n";
        let parsed = parse_observations(csv.as_bytes(), &DatasetSpec::decay());
        assert_eq!(parsed.observations.len(), 1);
        let o = parsed.observations[0];
        assert_eq!(o.x, 0.5 * SECONDS_PER_HOUR);
        assert_eq!(o.y, 0.2 * BQ_PER_TBQ);
        assert_eq!(o.sigma, 0.01 * BQ_PER_TBQ);
        assert_eq!(parsed.row_errors.len(), 2);
    }

    #[test]
    fn short_rows_are_reported() {
        let csv = "h\n0.5,0.1\n0.5,0.1,0.01,extra\n";
        let parsed = parse_observations(csv.as_bytes(), &DatasetSpec::tunnelling());
        assert_eq!(parsed.observations.len(), 1);
        assert_eq!(parsed.row_errors.len(), 1);
        assert_eq!(parsed.row_errors[0].line, 2);
    }

    #[test]
    fn two_files_are_concatenated_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        let mut fa = File::create(&a).unwrap();
        writeln!(fa, "t,A,dA\n2.0,0.3,0.01\n0.5,0.1,0.01").unwrap();
        let mut fb = File::create(&b).unwrap();
        writeln!(fb, "t,A,dA\n1.0,0.2,0.01\nbad,0.2,0.01").unwrap();

        let data = load_observation_set(&[a, b.clone()], &DatasetSpec::decay()).unwrap();
        let xs: Vec<f64> = data.observations.iter().map(|o| o.x / SECONDS_PER_HOUR).collect();
        assert_eq!(xs, vec![0.5, 1.0, 2.0]);
        assert_eq!(data.rows_read, 4);
        assert_eq!(data.rows_used, 3);
        assert_eq!(data.row_errors.len(), 1);
        assert_eq!(data.row_errors[0].file.as_deref(), Some(b.as_path()));
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.csv");
        std::fs::write(&good, "h\n0.5,0.1,0.01\n").unwrap();
        let missing = dir.path().join("missing.csv");

        let err = load_observation_set(&[good, missing], &DatasetSpec::tunnelling()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
        assert!(err.message().contains("missing.csv"));
    }

    #[test]
    fn all_rows_invalid_is_a_no_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "h\nx,y,z\n2,2,2\n").unwrap();

        let err = load_observation_set(&[path], &DatasetSpec::tunnelling()).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NO_DATA);
    }
}
