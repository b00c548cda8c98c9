//! CRUD event system used as the view invalidation signal
//!
//! This module provides:
//! - `CrudEvent`: typed events emitted after every mutation
//! - `EventEmitter`: the sink trait the managers emit through
//! - `EventBus`: broadcast channel distributing events to view consumers

mod bus;
mod types;

pub use bus::{EventBus, DEFAULT_CAPACITY};
pub use types::{CrudAction, CrudEvent, EventEmitter};
