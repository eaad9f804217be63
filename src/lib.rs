//! `lab-fits` library crate.
//!
//! The binary (`labfit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - each exercise pipeline can be driven from tests with simulated data

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
