//! Closed-form physics models.
//!
//! Models are implemented as small, pure functions so that fitting/search code can
//! stay generic over [`ModelKind`](crate::domain::ModelKind).

pub mod bounce;
pub mod decay;
pub mod model;
pub mod tunnelling;

pub use model::*;
