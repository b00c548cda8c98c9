//! Cascade deletion through the Epic → Journey → Step → Story hierarchy
//!
//! Deleting a release detaches its stories instead of deleting them; deleting
//! a story also deletes its breakdown stories.

mod engine;
mod plan;

pub use engine::{CascadeEngine, CascadeOutcome};
pub use plan::{CascadePlan, NodeRef, PlanEntry, PlannedAction};
