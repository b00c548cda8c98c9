//! Placement & reorder engine
//!
//! - [`ordering`]: pure list primitives and the priority cascade walk
//! - [`SiblingScope`] / [`MoveTarget`]: where a story lives and where it is dropped
//! - [`PlacementEngine`]: resolves drops and persists the recomputed siblings

mod engine;
pub mod ordering;
mod scope;

pub use engine::PlacementEngine;
pub use ordering::Ordered;
pub use scope::{MoveOutcome, MoveTarget, ReorderOutcome, SiblingScope};
