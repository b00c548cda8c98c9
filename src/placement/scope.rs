//! Sibling scopes, move targets and move outcomes

use crate::breakdown::codec;
use crate::error::OperationFailure;
use crate::store::models::{BreakdownRef, EntityKind, Story};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The set of stories a story is ordered against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SiblingScope {
    /// A cell of the map: one step crossed with one release (or the backlog)
    Placement {
        step_id: Uuid,
        release_id: Option<Uuid>,
    },
    /// One THEN-column of a parent story's breakdown
    Breakdown { parent_story_id: Uuid, column: u32 },
}

impl SiblingScope {
    /// Scope a story currently belongs to.
    ///
    /// `None` for a story carrying a breakdown tag whose parent is not a valid id:
    /// such a story belongs to no scope the engine can reorder.
    pub fn of(story: &Story) -> Option<Self> {
        match codec::breakdown_ref(story) {
            Some(r) => Some(SiblingScope::Breakdown {
                parent_story_id: r.parent_story_id,
                column: codec::column_of(story),
            }),
            None if codec::is_any_breakdown(story) => None,
            None => Some(SiblingScope::Placement {
                step_id: story.step_id,
                release_id: story.release_id,
            }),
        }
    }

    pub fn is_breakdown(&self) -> bool {
        matches!(self, SiblingScope::Breakdown { .. })
    }

    pub fn contains(&self, story: &Story) -> bool {
        match *self {
            SiblingScope::Placement {
                step_id,
                release_id,
            } => {
                !codec::is_any_breakdown(story)
                    && story.step_id == step_id
                    && story.release_id == release_id
            }
            SiblingScope::Breakdown {
                parent_story_id,
                column,
            } => codec::is_breakdown_of(story, parent_story_id) && codec::column_of(story) == column,
        }
    }

    /// Rewrite the scope fields of `story` so that it belongs here.
    ///
    /// A breakdown story is also stored in its parent's step; setting that is
    /// left to the caller, which has to look the parent up.
    pub fn relocate(&self, story: &mut Story) {
        match *self {
            SiblingScope::Placement {
                step_id,
                release_id,
            } => {
                story.step_id = step_id;
                story.release_id = release_id;
            }
            SiblingScope::Breakdown {
                parent_story_id,
                column,
            } => {
                story.breakdown = Some(BreakdownRef {
                    parent_story_id,
                    column,
                });
                story.description = codec::encode(parent_story_id, column);
            }
        }
    }
}

/// Where a dragged story was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MoveTarget {
    /// Dropped onto another story: take its scope and its position
    RelativeTo { story_id: Uuid },
    /// Dropped onto a cell, optionally next to a story inside it
    Container {
        step_id: Uuid,
        release_id: Option<Uuid>,
        #[serde(default)]
        relative_to: Option<Uuid>,
    },
}

impl MoveTarget {
    pub fn story(story_id: Uuid) -> Self {
        MoveTarget::RelativeTo { story_id }
    }

    /// Append to the end of a cell
    pub fn container(step_id: Uuid, release_id: Option<Uuid>) -> Self {
        MoveTarget::Container {
            step_id,
            release_id,
            relative_to: None,
        }
    }
}

/// Result of one story move.
///
/// Failed sibling updates are reported here rather than rolled back; the
/// stored state may then be partially reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub story_id: Uuid,
    pub source: SiblingScope,
    pub destination: SiblingScope,
    /// Records as persisted by this move
    pub updated: Vec<Story>,
    /// Siblings deleted concurrently, skipped without error
    pub skipped: Vec<Uuid>,
    pub failures: Vec<OperationFailure>,
}

impl MoveOutcome {
    pub(crate) fn unchanged(story_id: Uuid, scope: SiblingScope) -> Self {
        Self {
            story_id,
            source: scope,
            destination: scope,
            updated: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn crossed_scopes(&self) -> bool {
        self.source != self.destination
    }

    /// The moved story as persisted, if its own update went through
    pub fn moved(&self) -> Option<&Story> {
        self.updated.iter().find(|s| s.id == self.story_id)
    }
}

/// Result of reordering a step or a release among its journey's siblings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderOutcome {
    pub kind: EntityKind,
    pub id: Uuid,
    /// Ids whose `order` was persisted
    pub updated: Vec<Uuid>,
    pub failures: Vec<OperationFailure>,
}
