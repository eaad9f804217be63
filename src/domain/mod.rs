//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - observations and how they are read (`Observation`, `DatasetSpec`)
//! - model and strategy enums (`ModelKind`, `FitStrategy`)
//! - fit outputs (`FitResult`, `FitQuality`, `ObservationResidual`)
//! - per-exercise run configuration

pub mod types;

pub use types::*;
