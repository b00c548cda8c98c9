//! Story map requests and assembled views

use crate::priority::Priority;
use crate::store::models::{Epic, Release, Step, Story, StoryPatch, UserJourney};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Requests
// ============================================================================

/// Request to create a new epic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEpicRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to create a journey; without an order it is appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJourneyRequest {
    pub epic_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

/// Request to create a step; without an order it is appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStepRequest {
    pub journey_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

/// Request to create a release; without an order it is appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReleaseRequest {
    pub journey_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: Option<u32>,
}

/// Request to rename or re-describe a release
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReleaseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to create a story in a cell of the map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStoryRequest {
    pub step_id: Uuid,
    /// `None` puts the story in the backlog
    #[serde(default)]
    pub release_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to `should`
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Appended to the cell when absent
    #[serde(default)]
    pub order: Option<u32>,
}

/// Request to edit a story's content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStoryRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl From<UpdateStoryRequest> for StoryPatch {
    fn from(req: UpdateStoryRequest) -> Self {
        StoryPatch {
            title: req.title,
            description: req.description,
            priority: req.priority,
            ..Default::default()
        }
    }
}

// ============================================================================
// Views
// ============================================================================

/// A step with its stories in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepWithStories {
    pub step: Step,
    pub stories: Vec<Story>,
}

/// One horizontal lane of a journey: a release, or the backlog when `release` is `None`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseLane {
    pub release: Option<Release>,
    /// Every step of the journey, holding only this lane's stories
    pub steps: Vec<StepWithStories>,
}

impl ReleaseLane {
    pub fn is_backlog(&self) -> bool {
        self.release.is_none()
    }

    pub fn story_count(&self) -> usize {
        self.steps.iter().map(|s| s.stories.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JourneyWithSteps {
    pub journey: UserJourney,
    /// Steps with all of their stories, whatever the release
    pub steps: Vec<StepWithStories>,
    pub releases: Vec<Release>,
    /// One lane per release in release order, then the backlog lane
    pub lanes: Vec<ReleaseLane>,
}

impl JourneyWithSteps {
    pub fn backlog(&self) -> Option<&ReleaseLane> {
        self.lanes.iter().find(|lane| lane.is_backlog())
    }
}

/// An epic with its full hierarchy, ready for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteStoryMap {
    pub epic: Epic,
    pub journeys: Vec<JourneyWithSteps>,
}

impl CompleteStoryMap {
    pub fn story_count(&self) -> usize {
        self.journeys
            .iter()
            .flat_map(|j| &j.steps)
            .map(|s| s.stories.len())
            .sum()
    }
}
