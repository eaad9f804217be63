//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - residual CSV export (`export`)
//! - fit summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
