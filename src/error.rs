//! Error taxonomy shared by the engines
//!
//! The store speaks `anyhow::Result`; access violations travel inside it as
//! [`AccessError`] and are recovered by downcasting when an engine converts a
//! store error into an [`EngineError`].

use crate::store::models::EntityKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Raised by a store when the session may not touch a record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("unauthorized access to {kind} {id}")]
    Unauthorized { kind: EntityKind, id: Uuid },
}

/// Single failure reason returned by a public engine operation
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("unauthorized access to {kind} {id}")]
    Unauthorized { kind: EntityKind, id: Uuid },
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },
    #[error("invalid move target: {0}")]
    InvalidTarget(String),
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        EngineError::NotFound { kind, id }
    }

    /// True for errors the caller must not retry (session or ownership problems)
    pub fn is_access_error(&self) -> bool {
        matches!(
            self,
            EngineError::NotAuthenticated | EngineError::Unauthorized { .. }
        )
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<AccessError>() {
            Some(AccessError::NotAuthenticated) => EngineError::NotAuthenticated,
            Some(AccessError::Unauthorized { kind, id }) => EngineError::Unauthorized {
                kind: *kind,
                id: *id,
            },
            None => EngineError::Persistence(err),
        }
    }
}

/// What a batch was trying to do when one of its requests failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedAction {
    List,
    Delete,
    Detach,
    Update,
}

/// One failed request inside a cascade or reorder batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub kind: EntityKind,
    pub id: Uuid,
    pub action: FailedAction,
    pub message: String,
}

impl OperationFailure {
    pub fn new(kind: EntityKind, id: Uuid, action: FailedAction, err: &anyhow::Error) -> Self {
        Self {
            kind,
            id,
            action,
            message: format!("{err:#}"),
        }
    }
}
