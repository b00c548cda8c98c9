//! Story map manager: the entry point the interactive layer calls
//!
//! Owns plain CRUD over the hierarchy and delegates ordering, cascades,
//! breakdowns and assembly to the engines. Every mutation emits a
//! [`CrudEvent`](crate::events::CrudEvent) so that view consumers know to
//! re-assemble.

use super::assembler::StoryMapAssembler;
use super::models::*;
use crate::breakdown::{BreakdownColumn, BreakdownManager};
use crate::cascade::{CascadeEngine, CascadeOutcome, NodeRef};
use crate::error::{EngineError, FailedAction, OperationFailure};
use crate::events::{CrudAction, EventEmitter};
use crate::placement::{MoveOutcome, MoveTarget, PlacementEngine, ReorderOutcome, SiblingScope};
use crate::priority::Priority;
use crate::store::models::*;
use crate::store::traits::EntityStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Manager for story map operations
pub struct StoryMapManager {
    store: Arc<dyn EntityStore>,
    placement: PlacementEngine,
    cascade: CascadeEngine,
    breakdown: BreakdownManager,
    assembler: StoryMapAssembler,
    event_emitter: Option<Arc<dyn EventEmitter>>,
}

impl StoryMapManager {
    /// Create a new story map manager
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            placement: PlacementEngine::new(store.clone()),
            cascade: CascadeEngine::new(store.clone()),
            breakdown: BreakdownManager::new(store.clone()),
            assembler: StoryMapAssembler::new(store.clone()),
            store,
            event_emitter: None,
        }
    }

    /// Create a new story map manager with an event emitter
    pub fn with_event_emitter(store: Arc<dyn EntityStore>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            event_emitter: Some(emitter),
            ..Self::new(store)
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Emit a CRUD event (no-op if event_emitter is None)
    fn emit_action(&self, kind: EntityKind, action: CrudAction, id: Uuid, payload: serde_json::Value) {
        let Some(emitter) = &self.event_emitter else {
            return;
        };
        let id = id.to_string();
        match action {
            CrudAction::Created => emitter.emit_created(kind, &id, payload),
            CrudAction::Updated => emitter.emit_updated(kind, &id, payload),
            CrudAction::Deleted => emitter.emit_deleted(kind, &id, payload),
            CrudAction::Reordered => emitter.emit_reordered(kind, &id, payload),
        }
    }

    // ========================================================================
    // Epic operations
    // ========================================================================

    pub async fn create_epic(&self, req: CreateEpicRequest) -> Result<Epic, EngineError> {
        let epic = Epic::new(req.name, req.description.unwrap_or_default());
        let epic = self.store.create_epic(epic).await?;
        info!(epic_id = %epic.id, "Epic created");
        self.emit_action(
            EntityKind::Epic,
            CrudAction::Created,
            epic.id,
            serde_json::json!({ "name": epic.name }),
        );
        Ok(epic)
    }

    pub async fn get_epic(&self, epic_id: Uuid) -> Result<Option<Epic>, EngineError> {
        Ok(self.store.get_epic(epic_id).await?)
    }

    /// List the signed-in user's epics, newest first
    pub async fn list_epics(&self) -> Result<Vec<Epic>, EngineError> {
        Ok(self.store.list_epics().await?)
    }

    // ========================================================================
    // Journey operations
    // ========================================================================

    pub async fn create_journey(&self, req: CreateJourneyRequest) -> Result<UserJourney, EngineError> {
        self.store
            .get_epic(req.epic_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Epic, req.epic_id))?;
        let order = match req.order {
            Some(order) => order,
            None => self.store.list_journeys(req.epic_id).await?.len() as u32,
        };

        let mut journey = UserJourney::new(req.epic_id, req.name, order);
        journey.description = req.description.unwrap_or_default();
        let journey = self.store.create_journey(journey).await?;

        info!(journey_id = %journey.id, epic_id = %journey.epic_id, order, "Journey created");
        self.emit_action(
            EntityKind::Journey,
            CrudAction::Created,
            journey.id,
            serde_json::json!({ "epic_id": journey.epic_id }),
        );
        Ok(journey)
    }

    pub async fn list_journeys(&self, epic_id: Uuid) -> Result<Vec<UserJourney>, EngineError> {
        Ok(self.store.list_journeys(epic_id).await?)
    }

    // ========================================================================
    // Step operations
    // ========================================================================

    pub async fn create_step(&self, req: CreateStepRequest) -> Result<Step, EngineError> {
        self.require_journey(req.journey_id).await?;
        let order = match req.order {
            Some(order) => order,
            None => self.store.list_steps(req.journey_id).await?.len() as u32,
        };

        let mut step = Step::new(req.journey_id, req.name, order);
        step.description = req.description.unwrap_or_default();
        let step = self.store.create_step(step).await?;

        info!(step_id = %step.id, journey_id = %step.journey_id, order, "Step created");
        self.emit_action(
            EntityKind::Step,
            CrudAction::Created,
            step.id,
            serde_json::json!({ "journey_id": step.journey_id }),
        );
        Ok(step)
    }

    pub async fn list_steps(&self, journey_id: Uuid) -> Result<Vec<Step>, EngineError> {
        Ok(self.store.list_steps(journey_id).await?)
    }

    /// Move a step to `to_index` among its journey's steps
    pub async fn move_step(&self, step_id: Uuid, to_index: usize) -> Result<ReorderOutcome, EngineError> {
        let outcome = self.placement.move_step(step_id, to_index).await?;
        self.emit_action(
            EntityKind::Step,
            CrudAction::Reordered,
            step_id,
            serde_json::json!({ "updated": outcome.updated.len(), "failures": outcome.failures.len() }),
        );
        Ok(outcome)
    }

    // ========================================================================
    // Release operations
    // ========================================================================

    pub async fn create_release(&self, req: CreateReleaseRequest) -> Result<Release, EngineError> {
        self.require_journey(req.journey_id).await?;
        let order = match req.order {
            Some(order) => order,
            None => self.store.list_releases(req.journey_id).await?.len() as u32,
        };

        let mut release = Release::new(req.journey_id, req.name, order);
        release.description = req.description.unwrap_or_default();
        let release = self.store.create_release(release).await?;

        info!(release_id = %release.id, journey_id = %release.journey_id, order, "Release created");
        self.emit_action(
            EntityKind::Release,
            CrudAction::Created,
            release.id,
            serde_json::json!({ "journey_id": release.journey_id }),
        );
        Ok(release)
    }

    pub async fn list_releases(&self, journey_id: Uuid) -> Result<Vec<Release>, EngineError> {
        Ok(self.store.list_releases(journey_id).await?)
    }

    pub async fn update_release(&self, release_id: Uuid, req: UpdateReleaseRequest) -> Result<Release, EngineError> {
        let patch = NodePatch {
            name: req.name,
            description: req.description,
            order: None,
        };
        let release = self
            .store
            .update_release(release_id, patch)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Release, release_id))?;
        self.emit_action(EntityKind::Release, CrudAction::Updated, release_id, serde_json::Value::Null);
        Ok(release)
    }

    /// Move a release to `to_index` among its journey's releases
    pub async fn move_release(&self, release_id: Uuid, to_index: usize) -> Result<ReorderOutcome, EngineError> {
        let outcome = self.placement.move_release(release_id, to_index).await?;
        self.emit_action(
            EntityKind::Release,
            CrudAction::Reordered,
            release_id,
            serde_json::json!({ "updated": outcome.updated.len(), "failures": outcome.failures.len() }),
        );
        Ok(outcome)
    }

    // ========================================================================
    // Story operations
    // ========================================================================

    /// Create a story in a cell; it is appended unless an order is given
    pub async fn create_story(&self, req: CreateStoryRequest) -> Result<Story, EngineError> {
        let step = self
            .store
            .get_step(req.step_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Step, req.step_id))?;
        if let Some(release_id) = req.release_id {
            let release = self
                .store
                .get_release(release_id)
                .await?
                .ok_or_else(|| EngineError::not_found(EntityKind::Release, release_id))?;
            if release.journey_id != step.journey_id {
                return Err(EngineError::InvalidTarget(format!(
                    "release {release_id} does not belong to the journey of step {}",
                    step.id
                )));
            }
        }

        let order = match req.order {
            Some(order) => order,
            None => {
                let scope = SiblingScope::Placement {
                    step_id: step.id,
                    release_id: req.release_id,
                };
                self.store
                    .list_stories(&StoryFilter::step(step.id).in_release(req.release_id))
                    .await?
                    .iter()
                    .filter(|s| scope.contains(s))
                    .count() as u32
            }
        };

        let story = Story::new(step.id, req.title, req.priority.unwrap_or_default(), order)
            .in_release(req.release_id)
            .with_description(req.description.unwrap_or_default());
        let story = self.store.create_story(story).await?;

        info!(story_id = %story.id, step_id = %story.step_id, order, "Story created");
        self.emit_action(
            EntityKind::Story,
            CrudAction::Created,
            story.id,
            serde_json::json!({ "step_id": story.step_id, "release_id": story.release_id }),
        );
        Ok(story)
    }

    /// Edit a story's title, description or priority
    pub async fn update_story(&self, story_id: Uuid, req: UpdateStoryRequest) -> Result<Story, EngineError> {
        let patch = StoryPatch::from(req);
        if patch.is_empty() {
            return self
                .store
                .get_story(story_id)
                .await?
                .ok_or_else(|| EngineError::not_found(EntityKind::Story, story_id));
        }
        let story = self
            .store
            .update_story(story_id, patch)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Story, story_id))?;
        debug!(story_id = %story_id, "Story updated");
        self.emit_action(EntityKind::Story, CrudAction::Updated, story_id, serde_json::Value::Null);
        Ok(story)
    }

    /// Move a story to another release lane of its step (`None` = backlog).
    ///
    /// The story is appended to the destination lane and its old lane is compacted.
    pub async fn update_story_release(
        &self,
        story_id: Uuid,
        release_id: Option<Uuid>,
    ) -> Result<MoveOutcome, EngineError> {
        let story = self
            .store
            .get_story(story_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Story, story_id))?;
        self.moved_story(story_id, MoveTarget::container(story.step_id, release_id))
            .await
    }

    /// Delete a story with its breakdown stories, then close the gap it left
    pub async fn delete_story(&self, story_id: Uuid) -> Result<CascadeOutcome, EngineError> {
        let story = self
            .store
            .get_story(story_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Story, story_id))?;

        let mut outcome = self.cascade.delete_story(story_id).await?;
        if outcome.is_complete() {
            if let Some(scope) = SiblingScope::of(&story) {
                let failures = self.placement.compact(scope).await?;
                outcome.failures.extend(failures);
            }
        }

        self.emit_deleted(&outcome);
        Ok(outcome)
    }

    // ========================================================================
    // Engine operations
    // ========================================================================

    /// Apply a drag-and-drop of a story
    pub async fn moved_story(&self, story_id: Uuid, target: MoveTarget) -> Result<MoveOutcome, EngineError> {
        let outcome = self.placement.move_story(story_id, target).await?;
        if !outcome.updated.is_empty() || !outcome.failures.is_empty() {
            self.emit_action(
                EntityKind::Story,
                CrudAction::Reordered,
                story_id,
                serde_json::json!({
                    "destination": outcome.destination,
                    "updated": outcome.updated.len(),
                    "failures": outcome.failures.len(),
                }),
            );
        }
        Ok(outcome)
    }

    /// Delete a release; its stories join the backlog of their step, after the
    /// stories already there and in their former lane order
    pub async fn delete_release(&self, release_id: Uuid) -> Result<CascadeOutcome, EngineError> {
        let lane = self.store.list_stories(&StoryFilter::release(release_id)).await?;
        let mut outcome = self.cascade.delete_release(release_id).await?;

        let mut by_step: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for story in lane.iter().filter(|s| outcome.detached.contains(&s.id)) {
            by_step.entry(story.step_id).or_default().push(story.id);
        }
        for (step_id, arrivals) in by_step {
            let backlog = SiblingScope::Placement {
                step_id,
                release_id: None,
            };
            match self.placement.settle(backlog, &arrivals).await {
                Ok(failures) => outcome.failures.extend(failures),
                Err(e) => {
                    warn!(step_id = %step_id, error = %e, "Failed to renumber backlog");
                    let e = anyhow::Error::new(e);
                    outcome
                        .failures
                        .push(OperationFailure::new(EntityKind::Step, step_id, FailedAction::List, &e));
                }
            }
        }

        self.emit_deleted(&outcome);
        Ok(outcome)
    }

    /// Delete any node of the hierarchy with its cascade
    pub async fn delete_node(&self, kind: EntityKind, id: Uuid) -> Result<CascadeOutcome, EngineError> {
        match kind {
            EntityKind::Story => return self.delete_story(id).await,
            EntityKind::Release => return self.delete_release(id).await,
            _ => {}
        }
        let outcome = self.cascade.delete(NodeRef::new(kind, id)).await?;
        self.emit_deleted(&outcome);
        Ok(outcome)
    }

    fn emit_deleted(&self, outcome: &CascadeOutcome) {
        self.emit_action(
            outcome.target.kind,
            CrudAction::Deleted,
            outcome.target.id,
            serde_json::json!({
                "deleted": outcome.deleted.len(),
                "detached": outcome.detached.len(),
                "retained": outcome.retained.len(),
                "failures": outcome.failures.len(),
            }),
        );
    }

    pub async fn assemble_story_map(&self, epic_id: Uuid) -> Result<CompleteStoryMap, EngineError> {
        self.assembler.assemble(epic_id).await
    }

    pub async fn assemble_breakdown(
        &self,
        parent_story_id: Uuid,
        step_id: Uuid,
    ) -> Result<Vec<BreakdownColumn>, EngineError> {
        self.breakdown.assemble_breakdown(parent_story_id, step_id).await
    }

    pub async fn create_breakdown_story(
        &self,
        parent_story_id: Uuid,
        column: u32,
        title: impl Into<String>,
        priority: Priority,
    ) -> Result<Story, EngineError> {
        let story = self
            .breakdown
            .create_breakdown_story(parent_story_id, column, title, priority)
            .await?;
        self.emit_action(
            EntityKind::Story,
            CrudAction::Created,
            story.id,
            serde_json::json!({ "parent_story_id": parent_story_id, "column": column }),
        );
        Ok(story)
    }

    async fn require_journey(&self, journey_id: Uuid) -> Result<UserJourney, EngineError> {
        self.store
            .get_journey(journey_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Journey, journey_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{CrudEvent, EventBus};
    use crate::placement::ordering::is_dense;
    use crate::store::InMemoryStore;
    use crate::test_helpers::*;

    fn manager_with_bus(store: Arc<InMemoryStore>) -> (StoryMapManager, tokio::sync::broadcast::Receiver<CrudEvent>) {
        let bus = Arc::new(EventBus::default());
        let rx = bus.subscribe();
        (StoryMapManager::with_event_emitter(store, bus), rx)
    }

    fn story_req(step_id: Uuid, title: &str) -> CreateStoryRequest {
        CreateStoryRequest {
            step_id,
            release_id: None,
            title: title.to_string(),
            description: None,
            priority: None,
            order: None,
        }
    }

    #[tokio::test]
    async fn test_create_hierarchy_appends_and_emits() {
        let store = Arc::new(InMemoryStore::default());
        let (manager, mut rx) = manager_with_bus(store.clone());

        let epic = manager
            .create_epic(CreateEpicRequest {
                name: "Shop".into(),
                description: None,
            })
            .await
            .unwrap();
        let journey = manager
            .create_journey(CreateJourneyRequest {
                epic_id: epic.id,
                name: "Buy".into(),
                description: Some("Happy path".into()),
                order: None,
            })
            .await
            .unwrap();
        for name in ["Browse", "Pay"] {
            manager
                .create_step(CreateStepRequest {
                    journey_id: journey.id,
                    name: name.into(),
                    description: None,
                    order: None,
                })
                .await
                .unwrap();
        }
        let steps = manager.list_steps(journey.id).await.unwrap();
        assert_eq!(steps.iter().map(|s| s.order).collect::<Vec<_>>(), vec![0, 1]);

        let first = manager.create_story(story_req(steps[0].id, "One")).await.unwrap();
        let second = manager.create_story(story_req(steps[0].id, "Two")).await.unwrap();
        assert_eq!((first.order, second.order), (0, 1));
        assert_eq!(first.priority, Priority::Should);

        let first_event = rx.try_recv().unwrap();
        assert_eq!(first_event.entity_type, EntityKind::Epic);
        assert_eq!(first_event.action, CrudAction::Created);
        let mut seen = 1;
        while rx.try_recv().is_ok() {
            seen += 1;
        }
        // epic, journey, two steps, two stories
        assert_eq!(seen, 6);
    }

    #[tokio::test]
    async fn test_create_requires_parents() {
        let store = Arc::new(InMemoryStore::default());
        let manager = StoryMapManager::new(store.clone());

        let err = manager
            .create_journey(CreateJourneyRequest {
                epic_id: Uuid::new_v4(),
                name: "x".into(),
                description: None,
                order: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: EntityKind::Epic, .. }));

        let err = manager.create_story(story_req(Uuid::new_v4(), "x")).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: EntityKind::Step, .. }));

        let step = seed_step(&store).await;
        let other_journey = journey_in(&store, Uuid::new_v4(), "Other", 0).await;
        let foreign = release_in(&store, other_journey.id, "R", 0).await;
        let mut req = story_req(step.id, "x");
        req.release_id = Some(foreign.id);
        let err = manager.create_story(req).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_delete_story_compacts_scope() {
        let store = Arc::new(InMemoryStore::default());
        let step = seed_step(&store).await;
        let manager = StoryMapManager::new(store.clone());
        let a = story_in(&store, step.id, None, "A", Priority::Must, 0).await;
        story_in(&store, step.id, None, "B", Priority::Must, 1).await;
        story_in(&store, step.id, None, "C", Priority::Must, 2).await;
        manager
            .create_breakdown_story(a.id, 0, "A1", Priority::Must)
            .await
            .unwrap();

        let outcome = manager.delete_node(EntityKind::Story, a.id).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.deleted_count(EntityKind::Story), 2);
        let remaining = scope(&store, step.id, None).await;
        let orders: Vec<(String, u32)> = remaining.into_iter().map(|s| (s.title, s.order)).collect();
        assert_eq!(orders, vec![("B".to_string(), 0), ("C".to_string(), 1)]);
        assert_eq!(store.stories.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_story_release_moves_lane() {
        let store = Arc::new(InMemoryStore::default());
        let map = seed_map(&store).await;
        let cart = map.steps[0].id;
        let manager = StoryMapManager::new(store.clone());
        let target = scope(&store, cart, None).await[0].clone();

        let outcome = manager
            .update_story_release(target.id, Some(map.release.id))
            .await
            .unwrap();

        assert!(outcome.crossed_scopes());
        assert_eq!(
            scope_titles(&store, cart, Some(map.release.id)).await,
            vec!["View cart", "Edit quantity"]
        );
        let backlog = scope(&store, cart, None).await;
        assert_eq!(backlog.len(), 1);
        assert_eq!(backlog[0].order, 0);
    }

    #[tokio::test]
    async fn test_delete_release_emits_one_event() {
        let store = Arc::new(InMemoryStore::default());
        let map = seed_map(&store).await;
        let (manager, mut rx) = manager_with_bus(store.clone());

        let outcome = manager
            .delete_node(EntityKind::Release, map.release.id)
            .await
            .unwrap();
        assert_eq!(outcome.detached.len(), 2);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.action, CrudAction::Deleted);
        assert_eq!(event.entity_type, EntityKind::Release);
        assert_eq!(event.payload["detached"], 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_release_appends_lane_to_backlog() {
        let store = Arc::new(InMemoryStore::default());
        let map = seed_map(&store).await;
        let (cart, pay) = (map.steps[0].id, map.steps[1].id);
        story_in(&store, cart, Some(map.release.id), "Share cart", Priority::Could, 1).await;
        let manager = StoryMapManager::new(store.clone());

        let outcome = manager
            .delete_node(EntityKind::Release, map.release.id)
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.detached.len(), 3);
        let backlog = scope(&store, cart, None).await;
        let orders: Vec<(&str, u32)> = backlog.iter().map(|s| (s.title.as_str(), s.order)).collect();
        assert_eq!(
            orders,
            vec![
                ("Edit quantity", 0),
                ("Save for later", 1),
                ("View cart", 2),
                ("Share cart", 3)
            ]
        );
        assert!(is_dense(&backlog));
        assert!(is_dense(&scope(&store, pay, None).await));
        assert_eq!(scope_titles(&store, pay, None).await, vec!["Pay by invoice", "Pay by card"]);
    }

    #[tokio::test]
    async fn test_moving_parent_across_steps_keeps_breakdown_reachable() {
        let store = Arc::new(InMemoryStore::default());
        let map = seed_map(&store).await;
        let (cart, pay) = (map.steps[0].id, map.steps[1].id);
        let manager = StoryMapManager::new(store.clone());
        let parent = scope(&store, cart, None).await[0].clone();
        let child = manager
            .create_breakdown_story(parent.id, 0, "Bulk edit", Priority::Could)
            .await
            .unwrap();

        manager
            .moved_story(parent.id, MoveTarget::container(pay, None))
            .await
            .unwrap();

        assert_eq!(store.get_story(child.id).await.unwrap().unwrap().step_id, pay);
        let columns = manager.assemble_breakdown(parent.id, pay).await.unwrap();
        assert_eq!(columns[0].stories[0].id, child.id);

        let outcome = manager.delete_node(EntityKind::Story, parent.id).await.unwrap();
        assert_eq!(outcome.deleted_count(EntityKind::Story), 2);
        assert!(store.get_story(child.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_move_noop_emits_nothing() {
        let store = Arc::new(InMemoryStore::default());
        let step = seed_step(&store).await;
        let a = story_in(&store, step.id, None, "A", Priority::Must, 0).await;
        let (manager, mut rx) = manager_with_bus(store.clone());

        let outcome = manager.moved_story(a.id, MoveTarget::story(a.id)).await.unwrap();
        assert!(outcome.updated.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported_not_raised() {
        let store = Arc::new(InMemoryStore::default());
        let map = seed_map(&store).await;
        let manager = StoryMapManager::new(store.clone());
        store.fail_on(map.steps[1].id).await;

        let outcome = manager.delete_node(EntityKind::Epic, map.epic.id).await.unwrap();

        assert!(!outcome.is_complete());
        assert!(outcome
            .failures
            .iter()
            .any(|f| f.id == map.steps[1].id && f.action == FailedAction::List));
        assert!(manager.get_epic(map.epic.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_release_and_story() {
        let store = Arc::new(InMemoryStore::default());
        let map = seed_map(&store).await;
        let manager = StoryMapManager::new(store.clone());

        let release = manager
            .update_release(
                map.release.id,
                UpdateReleaseRequest {
                    name: Some("Beta".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(release.name, "Beta");
        assert_eq!(release.order, map.release.order);

        let story = scope(&store, map.steps[0].id, None).await[0].clone();
        let updated = manager
            .update_story(
                story.id,
                UpdateStoryRequest {
                    priority: Some(Priority::Wont),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.priority, Priority::Wont);
        assert_eq!(updated.title, story.title);

        let err = manager
            .update_story(Uuid::new_v4(), UpdateStoryRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }
}
