//! Breakdown loading and creation

use super::codec::{self, BreakdownColumn};
use crate::error::EngineError;
use crate::priority::Priority;
use crate::store::models::{BreakdownRef, EntityKind, Story, StoryFilter};
use crate::store::traits::EntityStore;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Reads and writes the breakdown stories attached to a parent story
pub struct BreakdownManager {
    store: Arc<dyn EntityStore>,
}

impl BreakdownManager {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Load the breakdown columns of `parent_story_id` shown under `step_id`.
    ///
    /// Breakdown stories follow their parent from step to step, so this is the
    /// parent's current step.
    pub async fn assemble_breakdown(
        &self,
        parent_story_id: Uuid,
        step_id: Uuid,
    ) -> Result<Vec<BreakdownColumn>, EngineError> {
        let stories = self
            .store
            .list_stories(&StoryFilter::breakdown_of(parent_story_id).in_step(step_id))
            .await?;
        let columns = codec::decode_columns(&stories, parent_story_id);
        debug!(
            parent_story_id = %parent_story_id,
            columns = columns.len(),
            "Breakdown assembled"
        );
        Ok(columns)
    }

    /// Create a story as an alternative inside `column` of the parent's breakdown.
    ///
    /// The new story sorts after both the column's current stories and the
    /// parent itself, lives in the parent's step, and stays out of any release.
    pub async fn create_breakdown_story(
        &self,
        parent_story_id: Uuid,
        column: u32,
        title: impl Into<String>,
        priority: Priority,
    ) -> Result<Story, EngineError> {
        let parent = self
            .store
            .get_story(parent_story_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Story, parent_story_id))?;

        if column > codec::MAX_COLUMN_INDEX {
            return Err(EngineError::InvalidTarget(format!(
                "breakdown column {column} exceeds {}",
                codec::MAX_COLUMN_INDEX
            )));
        }

        let siblings = self.children_of(&parent).await?;
        let column_max = siblings
            .iter()
            .filter(|s| codec::column_of(s) == column)
            .map(|s| s.order)
            .max()
            .unwrap_or(0);
        let order = column_max.max(parent.order) + 1;

        let mut story = Story::new(parent.step_id, title, priority, order)
            .with_description(codec::encode(parent_story_id, column));
        story.breakdown = Some(BreakdownRef {
            parent_story_id,
            column,
        });

        let created = self.store.create_story(story).await?;
        info!(
            story_id = %created.id,
            parent_story_id = %parent_story_id,
            column,
            order,
            "Breakdown story created"
        );
        Ok(created)
    }

    /// Every breakdown story of `parent`, in any column and wherever it is stored
    pub async fn children_of(&self, parent: &Story) -> Result<Vec<Story>, EngineError> {
        Ok(self
            .store
            .list_stories(&StoryFilter::breakdown_of(parent.id))
            .await?)
    }
}
