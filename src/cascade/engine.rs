//! Hierarchy cascade engine
//!
//! A cascade runs in two phases. Planning walks the hierarchy below the target
//! with list queries and records every action in a [`CascadePlan`]. Execution
//! then runs the plan in post-order, one request at a time.
//!
//! Execution is best-effort: a record that is already gone counts as done, and
//! a failed request is collected while its siblings are still attempted. A node
//! whose subtree did not fully succeed is kept, so a failure never leaves an
//! orphan behind and running the same cascade again converges.

use super::plan::{CascadePlan, NodeRef, PlannedAction};
use crate::breakdown::BreakdownManager;
use crate::error::{EngineError, FailedAction, OperationFailure};
use crate::store::models::{EntityKind, StoryFilter, StoryPatch};
use crate::store::traits::EntityStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a cascade did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeOutcome {
    pub target: NodeRef,
    pub deleted: Vec<NodeRef>,
    /// Stories moved back to the backlog by a release deletion
    pub detached: Vec<Uuid>,
    /// Planned records that no longer existed when their turn came
    pub already_gone: Vec<NodeRef>,
    /// Records kept because something below them failed
    pub retained: Vec<NodeRef>,
    pub failures: Vec<OperationFailure>,
}

impl CascadeOutcome {
    fn new(target: NodeRef) -> Self {
        Self {
            target,
            deleted: Vec::new(),
            detached: Vec::new(),
            already_gone: Vec::new(),
            retained: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.retained.is_empty()
    }

    pub fn deleted_count(&self, kind: EntityKind) -> usize {
        self.deleted.iter().filter(|n| n.kind == kind).count()
    }
}

pub struct CascadeEngine {
    store: Arc<dyn EntityStore>,
    breakdown: BreakdownManager,
}

impl CascadeEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            breakdown: BreakdownManager::new(store.clone()),
            store,
        }
    }

    pub async fn delete_epic(&self, id: Uuid) -> Result<CascadeOutcome, EngineError> {
        self.delete(NodeRef::new(EntityKind::Epic, id)).await
    }

    pub async fn delete_journey(&self, id: Uuid) -> Result<CascadeOutcome, EngineError> {
        self.delete(NodeRef::new(EntityKind::Journey, id)).await
    }

    pub async fn delete_step(&self, id: Uuid) -> Result<CascadeOutcome, EngineError> {
        self.delete(NodeRef::new(EntityKind::Step, id)).await
    }

    /// Delete a release; its stories move to the backlog
    pub async fn delete_release(&self, id: Uuid) -> Result<CascadeOutcome, EngineError> {
        self.delete(NodeRef::new(EntityKind::Release, id)).await
    }

    /// Delete a story together with its breakdown stories
    pub async fn delete_story(&self, id: Uuid) -> Result<CascadeOutcome, EngineError> {
        self.delete(NodeRef::new(EntityKind::Story, id)).await
    }

    /// Plan and execute the cascade rooted at `target`
    pub async fn delete(&self, target: NodeRef) -> Result<CascadeOutcome, EngineError> {
        self.ensure_exists(target).await?;

        let mut outcome = CascadeOutcome::new(target);
        let plan = self.plan(target, &mut outcome.failures).await;
        debug!(
            kind = %target.kind,
            id = %target.id,
            planned = plan.len(),
            stories = plan.count(EntityKind::Story),
            "Cascade planned"
        );

        self.execute(&plan, &mut outcome).await;

        info!(
            kind = %target.kind,
            id = %target.id,
            deleted = outcome.deleted.len(),
            detached = outcome.detached.len(),
            retained = outcome.retained.len(),
            failures = outcome.failures.len(),
            "Cascade finished"
        );
        Ok(outcome)
    }

    async fn ensure_exists(&self, target: NodeRef) -> Result<(), EngineError> {
        let id = target.id;
        let found = match target.kind {
            EntityKind::Epic => self.store.get_epic(id).await?.is_some(),
            EntityKind::Journey => self.store.get_journey(id).await?.is_some(),
            EntityKind::Step => self.store.get_step(id).await?.is_some(),
            EntityKind::Release => self.store.get_release(id).await?.is_some(),
            EntityKind::Story => self.store.get_story(id).await?.is_some(),
        };
        if found {
            Ok(())
        } else {
            Err(EngineError::not_found(target.kind, id))
        }
    }

    // ========================================================================
    // Planning
    // ========================================================================

    async fn plan(&self, target: NodeRef, failures: &mut Vec<OperationFailure>) -> CascadePlan {
        let mut plan = CascadePlan::new(target);
        let mut pending = vec![0usize];

        while let Some(index) = pending.pop() {
            let node = plan.entry(index).node;
            let is_root = index == 0;
            match self.children(node, is_root).await {
                Ok(children) => {
                    for (child, action) in children {
                        let child_index = plan.push(index, child, action);
                        pending.push(child_index);
                    }
                }
                Err(e) => {
                    warn!(kind = %node.kind, id = %node.id, error = %e, "Failed to list children");
                    failures.push(OperationFailure::new(node.kind, node.id, FailedAction::List, &e));
                    plan.mark_unenumerated(index);
                }
            }
        }
        plan
    }

    /// Direct children of a node and what to do with each.
    ///
    /// Releases and stories only expand when they are the cascade target: a
    /// journey's releases go once its steps (and so its stories) are gone, and
    /// every story of a step, breakdown stories included, is listed by the step.
    /// A target story's breakdown is looked up by parent, whatever step it is in.
    async fn children(&self, node: NodeRef, is_root: bool) -> anyhow::Result<Vec<(NodeRef, PlannedAction)>> {
        let delete = |kind: EntityKind, id: Uuid| (NodeRef::new(kind, id), PlannedAction::Delete);
        let children: Vec<(NodeRef, PlannedAction)> = match node.kind {
            EntityKind::Epic => self
                .store
                .list_journeys(node.id)
                .await?
                .into_iter()
                .map(|j| delete(EntityKind::Journey, j.id))
                .collect(),
            EntityKind::Journey => {
                let steps = self.store.list_steps(node.id).await?;
                let releases = self.store.list_releases(node.id).await?;
                steps
                    .into_iter()
                    .map(|s| delete(EntityKind::Step, s.id))
                    .chain(releases.into_iter().map(|r| delete(EntityKind::Release, r.id)))
                    .collect()
            }
            EntityKind::Step => self
                .store
                .list_stories(&StoryFilter::step(node.id))
                .await?
                .into_iter()
                .map(|s| delete(EntityKind::Story, s.id))
                .collect(),
            EntityKind::Release if is_root => self
                .store
                .list_stories(&StoryFilter::release(node.id))
                .await?
                .into_iter()
                .map(|s| (NodeRef::new(EntityKind::Story, s.id), PlannedAction::Detach))
                .collect(),
            EntityKind::Story if is_root => match self.store.get_story(node.id).await? {
                Some(parent) => self
                    .breakdown
                    .children_of(&parent)
                    .await?
                    .into_iter()
                    .map(|s| delete(EntityKind::Story, s.id))
                    .collect(),
                None => Vec::new(),
            },
            EntityKind::Release | EntityKind::Story => Vec::new(),
        };
        Ok(children)
    }

    // ========================================================================
    // Execution
    // ========================================================================

    async fn execute(&self, plan: &CascadePlan, outcome: &mut CascadeOutcome) {
        let mut blocked: Vec<bool> = (0..plan.len()).map(|i| !plan.entry(i).enumerated).collect();

        for index in plan.post_order() {
            let entry = plan.entry(index);
            let node = entry.node;

            let succeeded = if blocked[index] {
                debug!(kind = %node.kind, id = %node.id, "Retained, subtree incomplete");
                outcome.retained.push(node);
                false
            } else {
                match self.apply(node, entry.action).await {
                    Ok(true) => {
                        match entry.action {
                            PlannedAction::Delete => outcome.deleted.push(node),
                            PlannedAction::Detach => outcome.detached.push(node.id),
                        }
                        true
                    }
                    Ok(false) => {
                        outcome.already_gone.push(node);
                        true
                    }
                    Err(e) => {
                        let action = match entry.action {
                            PlannedAction::Delete => FailedAction::Delete,
                            PlannedAction::Detach => FailedAction::Detach,
                        };
                        warn!(kind = %node.kind, id = %node.id, error = %e, "Cascade step failed");
                        outcome
                            .failures
                            .push(OperationFailure::new(node.kind, node.id, action, &e));
                        false
                    }
                }
            };

            if !succeeded {
                if let Some(parent) = entry.parent {
                    blocked[parent] = true;
                }
            }
        }
    }

    /// Run one planned action; `Ok(false)` when the record no longer exists
    async fn apply(&self, node: NodeRef, action: PlannedAction) -> anyhow::Result<bool> {
        let id = node.id;
        match (action, node.kind) {
            (PlannedAction::Detach, _) => Ok(self
                .store
                .update_story(
                    id,
                    StoryPatch {
                        release_id: Some(None),
                        ..Default::default()
                    },
                )
                .await?
                .is_some()),
            (PlannedAction::Delete, EntityKind::Epic) => self.store.delete_epic(id).await,
            (PlannedAction::Delete, EntityKind::Journey) => self.store.delete_journey(id).await,
            (PlannedAction::Delete, EntityKind::Step) => self.store.delete_step(id).await,
            (PlannedAction::Delete, EntityKind::Release) => self.store.delete_release(id).await,
            (PlannedAction::Delete, EntityKind::Story) => self.store.delete_story(id).await,
        }
    }
}
