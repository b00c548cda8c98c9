//! Story map façade and views
//!
//! [`StoryMapManager`] is what callers hold; [`StoryMapAssembler`] builds the
//! nested read model it returns.

pub mod assembler;
mod manager;
pub mod models;

pub use assembler::StoryMapAssembler;
pub use manager::StoryMapManager;
pub use models::*;
