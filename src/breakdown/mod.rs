//! Breakdown of a story into sequential columns of alternative sub-stories
//!
//! - [`codec`] holds the tag format, the breakdown predicates and the column grouping
//! - [`BreakdownManager`] loads and creates breakdown stories against the store

pub mod codec;
mod manager;

pub use codec::{BreakdownColumn, MAX_COLUMN_INDEX};
pub use manager::BreakdownManager;
