//! Story map records persisted by the entity store

use crate::breakdown::codec;
use crate::priority::Priority;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Entity kinds
// ============================================================================

/// The collection a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Epic,
    Journey,
    Step,
    Release,
    Story,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Epic => "epic",
            EntityKind::Journey => "journey",
            EntityKind::Step => "step",
            EntityKind::Release => "release",
            EntityKind::Story => "story",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Hierarchy records
// ============================================================================

/// Root of a story map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epic {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Owner, stamped by the store on create
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Epic {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            user_id: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// An ordered user flow inside an epic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserJourney {
    pub id: Uuid,
    pub epic_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl UserJourney {
    pub fn new(epic_id: Uuid, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            epic_id,
            name: name.into(),
            description: String::new(),
            order,
            user_id: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// A column of the map (horizontal axis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: Uuid,
    pub journey_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Step {
    pub fn new(journey_id: Uuid, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            journey_id,
            name: name.into(),
            description: String::new(),
            order,
            user_id: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// A swim lane grouping stories across the steps of one journey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub id: Uuid,
    pub journey_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Release {
    pub fn new(journey_id: Uuid, name: impl Into<String>, order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            journey_id,
            name: name.into(),
            description: String::new(),
            order,
            user_id: String::new(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// Stories
// ============================================================================

/// Marks a story as an OR-option inside a THEN-column of another story's breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BreakdownRef {
    pub parent_story_id: Uuid,
    /// 0-based sequential column
    pub column: u32,
}

/// A unit of work inside a step (vertical axis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub step_id: Uuid,
    /// `None` places the story in the backlog
    #[serde(default)]
    pub release_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<BreakdownRef>,
    #[serde(default)]
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl Story {
    pub fn new(step_id: Uuid, title: impl Into<String>, priority: Priority, order: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            step_id,
            release_id: None,
            title: title.into(),
            description: String::new(),
            priority,
            order,
            breakdown: None,
            user_id: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Builder: place the story in a release
    pub fn in_release(mut self, release_id: Option<Uuid>) -> Self {
        self.release_id = release_id;
        self
    }

    /// Builder: set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, patch: &StoryPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(step_id) = patch.step_id {
            self.step_id = step_id;
        }
        if let Some(release_id) = patch.release_id {
            self.release_id = release_id;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        if let Some(breakdown) = patch.breakdown {
            self.breakdown = breakdown;
        }
    }
}

/// Partial story update; `None` fields are left untouched.
///
/// Nullable columns use `Option<Option<_>>`: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub step_id: Option<Uuid>,
    #[serde(default)]
    pub release_id: Option<Option<Uuid>>,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub breakdown: Option<Option<BreakdownRef>>,
}

impl StoryPatch {
    pub fn is_empty(&self) -> bool {
        *self == StoryPatch::default()
    }
}

/// Equality predicates for listing stories. Results are ordered by `order` ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryFilter {
    pub step_id: Option<Uuid>,
    /// `Some(None)` matches backlog stories only
    pub release_id: Option<Option<Uuid>>,
    /// Breakdown stories of this parent, in any column and any step
    pub parent_story_id: Option<Uuid>,
}

impl StoryFilter {
    /// Every story of a step, whatever its release
    pub fn step(step_id: Uuid) -> Self {
        Self {
            step_id: Some(step_id),
            ..Default::default()
        }
    }

    /// Every story referencing a release
    pub fn release(release_id: Uuid) -> Self {
        Self {
            release_id: Some(Some(release_id)),
            ..Default::default()
        }
    }

    /// Every breakdown story of a parent
    pub fn breakdown_of(parent_story_id: Uuid) -> Self {
        Self {
            parent_story_id: Some(parent_story_id),
            ..Default::default()
        }
    }

    /// Narrow to one release (or the backlog with `None`)
    pub fn in_release(mut self, release_id: Option<Uuid>) -> Self {
        self.release_id = Some(release_id);
        self
    }

    /// Narrow to one step
    pub fn in_step(mut self, step_id: Uuid) -> Self {
        self.step_id = Some(step_id);
        self
    }

    pub fn matches(&self, story: &Story) -> bool {
        self.step_id.map_or(true, |id| story.step_id == id)
            && self.release_id.map_or(true, |rel| story.release_id == rel)
            && self
                .parent_story_id
                .map_or(true, |parent| story.id != parent && codec::is_breakdown_of(story, parent))
    }
}

/// Partial update for journeys, steps and releases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

impl NodePatch {
    pub fn order(order: u32) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }
}
