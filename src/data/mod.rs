//! Synthetic data sources.

pub mod sample;

pub use sample::{SampleData, SimulateConfig, generate_sample, simulate, write_dataset_csv};
