//! Integration tests for story-map-engine
//!
//! Drive the public API end to end over the in-memory store.
//! Run with: cargo test --test story_map_tests

use std::collections::HashMap;
use std::sync::Arc;
use story_map_engine::events::CrudAction;
use story_map_engine::placement::ordering::is_dense;
use story_map_engine::placement::{MoveTarget, SiblingScope};
use story_map_engine::store::{
    EntityKind, EntityStore, InMemoryStore, Step, Story, StoryFilter, UserJourney,
};
use story_map_engine::storymap::*;
use story_map_engine::{AppState, Config, EngineError, Priority};
use uuid::Uuid;

fn test_state() -> (Arc<InMemoryStore>, AppState) {
    let store = Arc::new(InMemoryStore::new("alice"));
    let state = AppState::new(Config::default(), store.clone());
    (store, state)
}

async fn journey(manager: &StoryMapManager) -> UserJourney {
    let epic = manager
        .create_epic(CreateEpicRequest {
            name: "Checkout".into(),
            description: None,
        })
        .await
        .unwrap();
    manager
        .create_journey(CreateJourneyRequest {
            epic_id: epic.id,
            name: "Buy".into(),
            description: None,
            order: None,
        })
        .await
        .unwrap()
}

async fn step(manager: &StoryMapManager, journey_id: Uuid, name: &str) -> Step {
    manager
        .create_step(CreateStepRequest {
            journey_id,
            name: name.into(),
            description: None,
            order: None,
        })
        .await
        .unwrap()
}

async fn story(
    manager: &StoryMapManager,
    step_id: Uuid,
    release_id: Option<Uuid>,
    title: &str,
    priority: Priority,
) -> Story {
    manager
        .create_story(CreateStoryRequest {
            step_id,
            release_id,
            title: title.into(),
            description: None,
            priority: Some(priority),
            order: None,
        })
        .await
        .unwrap()
}

fn titles(stories: &[Story]) -> Vec<&str> {
    stories.iter().map(|s| s.title.as_str()).collect()
}

#[tokio::test]
async fn test_drag_to_top_promotes_and_stays_dense() {
    let (_, state) = test_state();
    let manager = state.story_map();
    let journey = journey(&manager).await;
    let find = step(&manager, journey.id, "Find").await;

    let a = story(&manager, find.id, None, "A", Priority::Must).await;
    story(&manager, find.id, None, "B", Priority::Should).await;
    let c = story(&manager, find.id, None, "C", Priority::Could).await;

    let outcome = manager.moved_story(c.id, MoveTarget::story(a.id)).await.unwrap();
    assert!(outcome.is_complete());
    assert!(!outcome.crossed_scopes());

    let map = manager.assemble_story_map(journey.epic_id).await.unwrap();
    let stories = &map.journeys[0].steps[0].stories;
    assert_eq!(titles(stories), vec!["C", "A", "B"]);
    assert_eq!(
        stories.iter().map(|s| s.order).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(
        stories.iter().map(|s| s.priority).collect::<Vec<_>>(),
        vec![Priority::Must, Priority::Must, Priority::Should]
    );
}

#[tokio::test]
async fn test_moving_between_release_lanes() {
    let (store, state) = test_state();
    let manager = state.story_map();
    let journey = journey(&manager).await;
    let pay = step(&manager, journey.id, "Pay").await;
    let mvp = manager
        .create_release(CreateReleaseRequest {
            journey_id: journey.id,
            name: "MVP".into(),
            description: None,
            order: None,
        })
        .await
        .unwrap();

    let card = story(&manager, pay.id, Some(mvp.id), "Card", Priority::Must).await;
    let invoice = story(&manager, pay.id, None, "Invoice", Priority::Could).await;
    story(&manager, pay.id, None, "Gift card", Priority::Wont).await;

    // Drop "Invoice" above "Card" in the MVP lane
    let outcome = manager
        .moved_story(invoice.id, MoveTarget::story(card.id))
        .await
        .unwrap();
    assert!(outcome.crossed_scopes());
    let moved = outcome.moved().unwrap();
    assert_eq!(moved.release_id, Some(mvp.id));
    assert_eq!(moved.priority, Priority::Must);

    let map = manager.assemble_story_map(journey.epic_id).await.unwrap();
    let lanes = &map.journeys[0].lanes;
    assert_eq!(titles(&lanes[0].steps[0].stories), vec!["Invoice", "Card"]);

    let backlog = map.journeys[0].backlog().unwrap();
    assert_eq!(titles(&backlog.steps[0].stories), vec!["Gift card"]);
    assert_eq!(backlog.steps[0].stories[0].order, 0);

    // And back to the backlog through the release setter
    manager.update_story_release(card.id, None).await.unwrap();
    let backlog = store
        .list_stories(&StoryFilter::step(pay.id).in_release(None))
        .await
        .unwrap();
    assert_eq!(titles(&backlog), vec!["Gift card", "Card"]);
    assert!(backlog.iter().all(|s| s.priority == Priority::Must));
}

#[tokio::test]
async fn test_breakdown_lifecycle() {
    let (store, state) = test_state();
    let manager = state.story_map();
    let journey = journey(&manager).await;
    let find = step(&manager, journey.id, "Find").await;
    let search = story(&manager, find.id, None, "Search", Priority::Must).await;
    let browse = story(&manager, find.id, None, "Browse", Priority::Should).await;

    let by_name = manager
        .create_breakdown_story(search.id, 0, "By name", Priority::Must)
        .await
        .unwrap();
    manager
        .create_breakdown_story(search.id, 0, "By tag", Priority::Could)
        .await
        .unwrap();
    manager
        .create_breakdown_story(search.id, 1, "Autocomplete", Priority::Should)
        .await
        .unwrap();
    assert!(by_name.order > search.order);

    let columns = manager.assemble_breakdown(search.id, find.id).await.unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].index, 0);
    assert_eq!(titles(&columns[0].stories), vec!["By name", "By tag"]);
    assert_eq!(titles(&columns[1].stories), vec!["Autocomplete"]);

    // The map only shows placed stories
    let map = manager.assemble_story_map(journey.epic_id).await.unwrap();
    assert_eq!(titles(&map.journeys[0].steps[0].stories), vec!["Search", "Browse"]);

    // Deleting the parent takes its breakdown with it and closes the gap
    let outcome = manager.delete_story(search.id).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.deleted_count(EntityKind::Story), 4);
    assert!(store.stories.read().await.values().all(|s| s.id == browse.id));
    assert_eq!(store.get_story(browse.id).await.unwrap().unwrap().order, 0);
}

#[tokio::test]
async fn test_deleting_a_journey_emits_one_event() {
    let (store, state) = test_state();
    let mut events = state.events.subscribe();
    let manager = state.story_map();
    let journey = journey(&manager).await;
    let find = step(&manager, journey.id, "Find").await;
    let pay = step(&manager, journey.id, "Pay").await;
    story(&manager, find.id, None, "Search", Priority::Must).await;
    story(&manager, pay.id, None, "Card", Priority::Must).await;
    while events.try_recv().is_ok() {}

    let outcome = manager
        .delete_node(EntityKind::Journey, journey.id)
        .await
        .unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.deleted_count(EntityKind::Step), 2);
    assert_eq!(outcome.deleted_count(EntityKind::Story), 2);
    assert!(store.steps.read().await.is_empty());

    let event = events.try_recv().unwrap();
    assert_eq!(event.entity_type, EntityKind::Journey);
    assert_eq!(event.action, CrudAction::Deleted);
    assert_eq!(event.entity_id, journey.id.to_string());
    assert!(events.try_recv().is_err());

    // The epic survives with an empty map
    let map = manager.assemble_story_map(journey.epic_id).await.unwrap();
    assert!(map.journeys.is_empty());
}

#[tokio::test]
async fn test_foreign_user_is_refused() {
    let (store, state) = test_state();
    let manager = state.story_map();
    let journey = journey(&manager).await;
    let find = step(&manager, journey.id, "Find").await;
    let first = story(&manager, find.id, None, "First", Priority::Must).await;
    let second = story(&manager, find.id, None, "Second", Priority::Could).await;

    store.set_session(Some("mallory")).await;
    let err = manager
        .moved_story(second.id, MoveTarget::story(first.id))
        .await
        .unwrap_err();
    assert!(err.is_access_error());

    let err = manager
        .delete_node(EntityKind::Step, find.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized { kind: EntityKind::Step, .. }));

    store.set_session(None).await;
    let err = manager.list_epics().await.unwrap_err();
    assert!(matches!(err, EngineError::NotAuthenticated));

    // Nothing changed for the owner
    store.set_session(Some("alice")).await;
    let unchanged = store.get_story(second.id).await.unwrap().unwrap();
    assert_eq!((unchanged.order, unchanged.priority), (1, Priority::Could));
}

/// Map cells must hold exactly `0..n`. New breakdown stories are numbered after
/// their parent, so a column only has to keep its orders unique.
async fn assert_scopes_ordered(store: &InMemoryStore, after: &str) {
    let mut scopes: HashMap<SiblingScope, Vec<Story>> = HashMap::new();
    for story in store.stories.read().await.values() {
        let scope = SiblingScope::of(story).expect("well-formed scope");
        scopes.entry(scope).or_default().push(story.clone());
    }
    for (scope, members) in &scopes {
        let mut orders: Vec<u32> = members.iter().map(|s| s.order).collect();
        orders.sort_unstable();
        if scope.is_breakdown() {
            let before = orders.len();
            orders.dedup();
            assert_eq!(orders.len(), before, "{scope:?} has duplicate orders after {after}");
        } else {
            assert!(is_dense(members), "{scope:?} not dense after {after}: {orders:?}");
        }
    }
}

#[tokio::test]
async fn test_orders_stay_dense_across_mixed_edits() {
    let (store, state) = test_state();
    let manager = state.story_map();
    let journey = journey(&manager).await;
    let find = step(&manager, journey.id, "Find").await;
    let pay = step(&manager, journey.id, "Pay").await;
    let mut releases = Vec::new();
    for name in ["MVP", "Later"] {
        let release = manager
            .create_release(CreateReleaseRequest {
                journey_id: journey.id,
                name: name.into(),
                description: None,
                order: None,
            })
            .await
            .unwrap();
        releases.push(release);
    }
    let (mvp, later) = (releases[0].id, releases[1].id);

    let search = story(&manager, find.id, None, "Search", Priority::Must).await;
    let browse = story(&manager, find.id, None, "Browse", Priority::Should).await;
    let filter = story(&manager, find.id, Some(mvp), "Filter", Priority::Must).await;
    story(&manager, find.id, Some(mvp), "Sort", Priority::Could).await;
    let card = story(&manager, pay.id, None, "Card", Priority::Must).await;
    story(&manager, pay.id, Some(mvp), "Wallet", Priority::Should).await;
    story(&manager, pay.id, Some(later), "Crypto", Priority::Wont).await;
    let by_name = manager
        .create_breakdown_story(search.id, 0, "By name", Priority::Must)
        .await
        .unwrap();
    manager
        .create_breakdown_story(search.id, 0, "By tag", Priority::Could)
        .await
        .unwrap();
    let fuzzy = manager
        .create_breakdown_story(search.id, 1, "Fuzzy", Priority::Should)
        .await
        .unwrap();
    assert_scopes_ordered(&store, "seeding").await;

    manager
        .moved_story(browse.id, MoveTarget::story(search.id))
        .await
        .unwrap();
    assert_scopes_ordered(&store, "reorder").await;

    manager.update_story_release(filter.id, None).await.unwrap();
    assert_scopes_ordered(&store, "lane change").await;

    manager
        .moved_story(search.id, MoveTarget::story(card.id))
        .await
        .unwrap();
    assert_scopes_ordered(&store, "cross-step move").await;
    let columns = manager.assemble_breakdown(search.id, pay.id).await.unwrap();
    assert_eq!(columns.len(), 2);

    manager
        .moved_story(fuzzy.id, MoveTarget::story(by_name.id))
        .await
        .unwrap();
    assert_scopes_ordered(&store, "breakdown column move").await;
    let column = &manager.assemble_breakdown(search.id, pay.id).await.unwrap()[0];
    assert!(is_dense(&column.stories));
    assert_eq!(titles(&column.stories), vec!["Fuzzy", "By name", "By tag"]);

    manager
        .moved_story(card.id, MoveTarget::container(pay.id, Some(later)))
        .await
        .unwrap();
    assert_scopes_ordered(&store, "container drop").await;

    manager.delete_node(EntityKind::Story, browse.id).await.unwrap();
    assert_scopes_ordered(&store, "story delete").await;

    let outcome = manager.delete_node(EntityKind::Release, mvp).await.unwrap();
    assert!(outcome.is_complete());
    assert_scopes_ordered(&store, "release delete").await;

    manager.delete_node(EntityKind::Story, search.id).await.unwrap();
    assert_scopes_ordered(&store, "parent delete").await;
    assert!(store
        .list_stories(&StoryFilter::breakdown_of(search.id))
        .await
        .unwrap()
        .is_empty());

    let outcome = manager.delete_node(EntityKind::Release, later).await.unwrap();
    assert!(outcome.is_complete());
    assert_scopes_ordered(&store, "second release delete").await;
    assert_eq!(
        titles(&store.list_stories(&StoryFilter::step(pay.id)).await.unwrap()),
        vec!["Wallet", "Crypto", "Card"]
    );
}
