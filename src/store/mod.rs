//! Entity store seam and the records it holds

pub mod memory;
pub mod models;
pub mod traits;

pub use memory::InMemoryStore;
pub use models::*;
pub use traits::EntityStore;
