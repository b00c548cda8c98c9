//! CRUD event types used to invalidate assembled views

use crate::store::models::EntityKind;
use serde::{Deserialize, Serialize};

/// The CRUD action performed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudAction {
    Created,
    Updated,
    Deleted,
    /// Order and/or priority of a sibling scope was recomputed
    Reordered,
}

/// A CRUD event emitted after a mutation
///
/// Consumers treat any event as a signal to re-assemble the views they hold.
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrudEvent {
    /// The type of entity that was mutated
    pub entity_type: EntityKind,
    /// The action performed
    pub action: CrudAction,
    /// The ID of the mutated entity
    pub entity_id: String,
    /// Optional payload (counts, partial-failure summary, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl CrudEvent {
    /// Create a new CrudEvent with the current timestamp
    pub fn new(entity_type: EntityKind, action: CrudAction, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            action,
            entity_id: entity_id.into(),
            payload: serde_json::Value::Null,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Sink for CRUD events. Emitting must never block or fail.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: CrudEvent);

    fn emit_created(&self, entity_type: EntityKind, entity_id: &str, payload: serde_json::Value) {
        self.emit(CrudEvent::new(entity_type, CrudAction::Created, entity_id).with_payload(payload));
    }

    fn emit_updated(&self, entity_type: EntityKind, entity_id: &str, payload: serde_json::Value) {
        self.emit(CrudEvent::new(entity_type, CrudAction::Updated, entity_id).with_payload(payload));
    }

    fn emit_reordered(&self, entity_type: EntityKind, entity_id: &str, payload: serde_json::Value) {
        self.emit(CrudEvent::new(entity_type, CrudAction::Reordered, entity_id).with_payload(payload));
    }

    fn emit_deleted(&self, entity_type: EntityKind, entity_id: &str, payload: serde_json::Value) {
        self.emit(CrudEvent::new(entity_type, CrudAction::Deleted, entity_id).with_payload(payload));
    }
}
