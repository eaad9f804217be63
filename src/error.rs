//! Application error type.
//!
//! Every fallible operation that should end the run returns an `AppError`
//! carrying the process exit code. Row-level data problems are *not* errors;
//! they are collected as `RowError`s by the ingest layer.

/// Bad input: missing file, invalid CLI value, closed stdin.
pub const EXIT_INPUT: u8 = 2;
/// Nothing left to fit after validation/filtering.
pub const EXIT_NO_DATA: u8 = 3;
/// Numerical failure (degenerate fit, singular covariance).
pub const EXIT_NUMERIC: u8 = 4;
/// Failed to write a plot or export file.
pub const EXIT_OUTPUT: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn numeric(message: impl Into<String>) -> Self {
        Self::new(EXIT_NUMERIC, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
