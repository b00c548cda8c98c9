//! Placement & reorder engine
//!
//! Computes new `order` and `priority` values for the siblings affected by a
//! move and persists them as one concurrent batch. Holds no state between calls.

use super::ordering::{cascade_priorities, insert_item, move_item, renumber, reorder_by_id};
use super::scope::{MoveOutcome, MoveTarget, ReorderOutcome, SiblingScope};
use crate::error::{EngineError, FailedAction, OperationFailure};
use crate::priority::Priority;
use crate::store::models::{EntityKind, NodePatch, Story, StoryFilter, StoryPatch};
use crate::store::traits::EntityStore;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Settled results of one update batch
#[derive(Debug, Default)]
struct Batch {
    updated: Vec<Story>,
    skipped: Vec<Uuid>,
    failures: Vec<OperationFailure>,
}

/// Ordering service for stories, steps and releases
pub struct PlacementEngine {
    store: Arc<dyn EntityStore>,
}

impl PlacementEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    // ========================================================================
    // Story moves
    // ========================================================================

    /// Move a story to `target`, renumbering and re-prioritizing its siblings.
    pub async fn move_story(&self, story_id: Uuid, target: MoveTarget) -> Result<MoveOutcome, EngineError> {
        let moving = self
            .store
            .get_story(story_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Story, story_id))?;
        let source = SiblingScope::of(&moving).ok_or_else(|| {
            EngineError::InvalidTarget(format!("story {story_id} carries a malformed breakdown tag"))
        })?;

        if target == MoveTarget::story(story_id) {
            debug!(story_id = %story_id, "Story dropped onto itself");
            return Ok(MoveOutcome::unchanged(story_id, source));
        }

        let (destination, anchor) = self.resolve(&target).await?;
        if source.is_breakdown() != destination.is_breakdown() {
            return Err(EngineError::InvalidTarget(
                "cannot move between a breakdown column and the map".to_string(),
            ));
        }

        let outcome = if source == destination {
            self.reorder_within(moving, source, anchor).await?
        } else {
            self.transfer(moving, source, destination, anchor).await?
        };

        info!(
            story_id = %story_id,
            crossed_scopes = outcome.crossed_scopes(),
            updated = outcome.updated.len(),
            skipped = outcome.skipped.len(),
            failures = outcome.failures.len(),
            "Story moved"
        );
        Ok(outcome)
    }

    /// Destination scope of a drop, plus the story whose position it takes
    async fn resolve(&self, target: &MoveTarget) -> Result<(SiblingScope, Option<Uuid>), EngineError> {
        match *target {
            MoveTarget::RelativeTo { story_id } => {
                let over = self
                    .store
                    .get_story(story_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found(EntityKind::Story, story_id))?;
                let scope = SiblingScope::of(&over).ok_or_else(|| {
                    EngineError::InvalidTarget(format!("story {story_id} carries a malformed breakdown tag"))
                })?;
                Ok((scope, Some(story_id)))
            }
            MoveTarget::Container {
                step_id,
                release_id,
                relative_to,
            } => {
                let step = self
                    .store
                    .get_step(step_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found(EntityKind::Step, step_id))?;
                if let Some(release_id) = release_id {
                    let release = self
                        .store
                        .get_release(release_id)
                        .await?
                        .ok_or_else(|| EngineError::not_found(EntityKind::Release, release_id))?;
                    if release.journey_id != step.journey_id {
                        return Err(EngineError::InvalidTarget(format!(
                            "release {release_id} does not belong to the journey of step {step_id}"
                        )));
                    }
                }
                Ok((
                    SiblingScope::Placement {
                        step_id,
                        release_id,
                    },
                    relative_to,
                ))
            }
        }
    }

    /// Current members of a scope in stored order
    async fn members(&self, scope: &SiblingScope) -> Result<Vec<Story>, EngineError> {
        let filter = match *scope {
            SiblingScope::Placement {
                step_id,
                release_id,
            } => StoryFilter::step(step_id).in_release(release_id),
            SiblingScope::Breakdown { parent_story_id, .. } => StoryFilter::breakdown_of(parent_story_id),
        };
        let stories = self.store.list_stories(&filter).await?;
        Ok(stories.into_iter().filter(|s| scope.contains(s)).collect())
    }

    async fn reorder_within(
        &self,
        moving: Story,
        scope: SiblingScope,
        anchor: Option<Uuid>,
    ) -> Result<MoveOutcome, EngineError> {
        let mut siblings = self.members(&scope).await?;
        let from = match siblings.iter().position(|s| s.id == moving.id) {
            Some(index) => index,
            None => {
                siblings.push(moving.clone());
                siblings.len() - 1
            }
        };
        let to = anchor
            .and_then(|id| siblings.iter().position(|s| s.id == id))
            .unwrap_or(siblings.len() - 1);

        move_item(&mut siblings, from, to);
        renumber(&mut siblings);
        cascade_priorities(&mut siblings);

        let writes = siblings
            .iter()
            .map(|s| (s.id, order_patch(s.order, Some(s.priority))))
            .collect();
        let batch = self.persist(writes).await;

        Ok(outcome(moving.id, scope, scope, batch))
    }

    async fn transfer(
        &self,
        moving: Story,
        source: SiblingScope,
        destination: SiblingScope,
        anchor: Option<Uuid>,
    ) -> Result<MoveOutcome, EngineError> {
        // Breakdown stories are stored in their parent's step
        let target_step = match destination {
            SiblingScope::Placement { step_id, .. } => step_id,
            SiblingScope::Breakdown { parent_story_id, .. } => self.parent_step(parent_story_id).await?,
        };
        let followers = if !source.is_breakdown() && target_step != moving.step_id {
            self.store
                .list_stories(&StoryFilter::breakdown_of(moving.id))
                .await?
        } else {
            Vec::new()
        };

        let mut left_behind = self.members(&source).await?;
        left_behind.retain(|s| s.id != moving.id);
        let mut arrivals = self.members(&destination).await?;
        arrivals.retain(|s| s.id != moving.id);

        let before: HashMap<Uuid, (u32, Priority)> =
            arrivals.iter().map(|s| (s.id, (s.order, s.priority))).collect();
        let index = anchor
            .and_then(|id| arrivals.iter().position(|s| s.id == id))
            .unwrap_or(arrivals.len());

        let mut placed = moving.clone();
        destination.relocate(&mut placed);
        placed.step_id = target_step;
        insert_item(&mut arrivals, placed, index);
        renumber(&mut arrivals);
        cascade_priorities(&mut arrivals);

        let mut writes = Vec::new();
        for story in &arrivals {
            if story.id == moving.id {
                writes.push((story.id, placement_patch(story, &destination)));
            } else if before.get(&story.id) != Some(&(story.order, story.priority)) {
                writes.push((story.id, order_patch(story.order, Some(story.priority))));
            }
        }
        for index in renumber(&mut left_behind) {
            let story = &left_behind[index];
            writes.push((story.id, order_patch(story.order, None)));
        }
        // A parent changing step takes its breakdown along
        for child in &followers {
            let patch = StoryPatch {
                step_id: Some(target_step),
                ..Default::default()
            };
            writes.push((child.id, patch));
        }

        debug!(
            story_id = %moving.id,
            index,
            followers = followers.len(),
            writes = writes.len(),
            "Story transferred between scopes"
        );
        let batch = self.persist(writes).await;
        Ok(outcome(moving.id, source, destination, batch))
    }

    async fn parent_step(&self, parent_story_id: Uuid) -> Result<Uuid, EngineError> {
        self.store
            .get_story(parent_story_id)
            .await?
            .map(|parent| parent.step_id)
            .ok_or_else(|| EngineError::not_found(EntityKind::Story, parent_story_id))
    }

    /// Issue every update concurrently and wait for all of them to settle
    async fn persist(&self, writes: Vec<(Uuid, StoryPatch)>) -> Batch {
        let store = &self.store;
        let results = join_all(
            writes
                .into_iter()
                .map(|(id, patch)| async move { (id, store.update_story(id, patch).await) }),
        )
        .await;

        let mut batch = Batch::default();
        for (id, result) in results {
            match result {
                Ok(Some(story)) => batch.updated.push(story),
                Ok(None) => {
                    debug!(story_id = %id, "Sibling vanished during reorder, skipped");
                    batch.skipped.push(id);
                }
                Err(e) => {
                    warn!(story_id = %id, error = %e, "Failed to persist story order");
                    batch
                        .failures
                        .push(OperationFailure::new(EntityKind::Story, id, FailedAction::Update, &e));
                }
            }
        }
        batch
    }

    // ========================================================================
    // Step and release moves
    // ========================================================================

    /// Move a step to `to_index` among the steps of its journey
    pub async fn move_step(&self, step_id: Uuid, to_index: usize) -> Result<ReorderOutcome, EngineError> {
        let step = self
            .store
            .get_step(step_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Step, step_id))?;
        let mut steps = self.store.list_steps(step.journey_id).await?;
        let changed = reorder_by_id(&mut steps, step_id, to_index).unwrap_or_default();

        let store = &self.store;
        let results = join_all(changed.into_iter().map(|(id, order)| async move {
            (id, store.update_step(id, NodePatch::order(order)).await)
        }))
        .await;

        Ok(node_outcome(EntityKind::Step, step_id, results))
    }

    /// Move a release to `to_index` among the releases of its journey
    pub async fn move_release(&self, release_id: Uuid, to_index: usize) -> Result<ReorderOutcome, EngineError> {
        let release = self
            .store
            .get_release(release_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Release, release_id))?;
        let mut releases = self.store.list_releases(release.journey_id).await?;
        let changed = reorder_by_id(&mut releases, release_id, to_index).unwrap_or_default();

        let store = &self.store;
        let results = join_all(changed.into_iter().map(|(id, order)| async move {
            (id, store.update_release(id, NodePatch::order(order)).await)
        }))
        .await;

        Ok(node_outcome(EntityKind::Release, release_id, results))
    }

    // ========================================================================
    // Compaction
    // ========================================================================

    /// Renumber a scope densely after one of its members left it
    pub async fn compact(&self, scope: SiblingScope) -> Result<Vec<OperationFailure>, EngineError> {
        self.settle(scope, &[]).await
    }

    /// Renumber a scope densely with `arrivals` placed last, in the given order.
    ///
    /// Used when stories joined the scope without being ordered against it,
    /// e.g. a deleted release's stories falling back to the backlog.
    pub async fn settle(&self, scope: SiblingScope, arrivals: &[Uuid]) -> Result<Vec<OperationFailure>, EngineError> {
        let (mut joined, mut members): (Vec<Story>, Vec<Story>) = self
            .members(&scope)
            .await?
            .into_iter()
            .partition(|s| arrivals.contains(&s.id));
        joined.sort_by_key(|s| arrivals.iter().position(|id| *id == s.id));
        members.extend(joined);

        let writes: Vec<_> = renumber(&mut members)
            .into_iter()
            .map(|index| (members[index].id, order_patch(members[index].order, None)))
            .collect();
        if writes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.persist(writes).await.failures)
    }
}

fn order_patch(order: u32, priority: Option<Priority>) -> StoryPatch {
    StoryPatch {
        order: Some(order),
        priority,
        ..Default::default()
    }
}

/// Full patch for the moved story: new scope fields, order and priority together
fn placement_patch(story: &Story, destination: &SiblingScope) -> StoryPatch {
    let mut patch = order_patch(story.order, Some(story.priority));
    match *destination {
        SiblingScope::Placement {
            step_id,
            release_id,
        } => {
            patch.step_id = Some(step_id);
            patch.release_id = Some(release_id);
        }
        SiblingScope::Breakdown { .. } => {
            patch.step_id = Some(story.step_id);
            patch.breakdown = Some(story.breakdown);
            patch.description = Some(story.description.clone());
        }
    }
    patch
}

fn outcome(story_id: Uuid, source: SiblingScope, destination: SiblingScope, batch: Batch) -> MoveOutcome {
    MoveOutcome {
        story_id,
        source,
        destination,
        updated: batch.updated,
        skipped: batch.skipped,
        failures: batch.failures,
    }
}

fn node_outcome<T>(kind: EntityKind, id: Uuid, results: Vec<(Uuid, anyhow::Result<Option<T>>)>) -> ReorderOutcome {
    let mut updated = Vec::new();
    let mut failures = Vec::new();
    for (node_id, result) in results {
        match result {
            Ok(Some(_)) => updated.push(node_id),
            Ok(None) => debug!(%kind, id = %node_id, "Sibling vanished during reorder, skipped"),
            Err(e) => {
                warn!(%kind, id = %node_id, error = %e, "Failed to persist order");
                failures.push(OperationFailure::new(kind, node_id, FailedAction::Update, &e));
            }
        }
    }
    info!(%kind, id = %id, updated = updated.len(), failures = failures.len(), "Reordered");
    ReorderOutcome {
        kind,
        id,
        updated,
        failures,
    }
}
