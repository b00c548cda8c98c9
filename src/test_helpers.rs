//! Test helper factories and mock state builders
//!
//! Provides convenience functions for seeding an in-memory store with a small
//! story map and for building a mock AppState.
#![allow(dead_code)]

use crate::events::EventBus;
use crate::priority::Priority;
use crate::store::models::*;
use crate::store::traits::EntityStore;
use crate::store::InMemoryStore;
use crate::{AppState, Config};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Mock state builders
// ============================================================================

/// Create a mock AppState over an empty in-memory store signed in as "local"
pub fn mock_app_state() -> AppState {
    AppState {
        store: Arc::new(InMemoryStore::default()),
        events: Arc::new(EventBus::default()),
        config: Arc::new(Config::default()),
    }
}

// ============================================================================
// Seeding factories
// ============================================================================

pub async fn seed_epic(store: &InMemoryStore) -> Epic {
    store
        .create_epic(Epic::new("Test Epic", "An epic for unit testing"))
        .await
        .expect("seed epic")
}

pub async fn journey_in(store: &InMemoryStore, epic_id: Uuid, name: &str, order: u32) -> UserJourney {
    store
        .create_journey(UserJourney::new(epic_id, name, order))
        .await
        .expect("seed journey")
}

pub async fn step_in(store: &InMemoryStore, journey_id: Uuid, name: &str, order: u32) -> Step {
    store
        .create_step(Step::new(journey_id, name, order))
        .await
        .expect("seed step")
}

pub async fn release_in(store: &InMemoryStore, journey_id: Uuid, name: &str, order: u32) -> Release {
    store
        .create_release(Release::new(journey_id, name, order))
        .await
        .expect("seed release")
}

pub async fn story_in(
    store: &InMemoryStore,
    step_id: Uuid,
    release_id: Option<Uuid>,
    title: &str,
    priority: Priority,
    order: u32,
) -> Story {
    store
        .create_story(Story::new(step_id, title, priority, order).in_release(release_id))
        .await
        .expect("seed story")
}

/// Seed an epic with one journey and return that journey's single step
pub async fn seed_step(store: &InMemoryStore) -> Step {
    let epic = seed_epic(store).await;
    let journey = journey_in(store, epic.id, "Browse", 0).await;
    step_in(store, journey.id, "Search", 0).await
}

/// A small but complete map: one journey, two steps, one release
pub struct SeededMap {
    pub epic: Epic,
    pub journey: UserJourney,
    pub steps: Vec<Step>,
    pub release: Release,
}

/// Seed a journey with two steps holding three and two stories, plus a
/// release referenced by one story of each step.
pub async fn seed_map(store: &InMemoryStore) -> SeededMap {
    let epic = seed_epic(store).await;
    let journey = journey_in(store, epic.id, "Checkout", 0).await;
    let first = step_in(store, journey.id, "Cart", 0).await;
    let second = step_in(store, journey.id, "Pay", 1).await;
    let release = release_in(store, journey.id, "MVP", 0).await;

    story_in(store, first.id, Some(release.id), "View cart", Priority::Must, 0).await;
    story_in(store, first.id, None, "Edit quantity", Priority::Should, 0).await;
    story_in(store, first.id, None, "Save for later", Priority::Could, 1).await;
    story_in(store, second.id, Some(release.id), "Pay by card", Priority::Must, 0).await;
    story_in(store, second.id, None, "Pay by invoice", Priority::Wont, 0).await;

    SeededMap {
        epic,
        journey,
        steps: vec![first, second],
        release,
    }
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Titles of a placement scope in stored order
pub async fn scope_titles(store: &InMemoryStore, step_id: Uuid, release_id: Option<Uuid>) -> Vec<String> {
    scope(store, step_id, release_id)
        .await
        .into_iter()
        .map(|s| s.title)
        .collect()
}

/// Stories of a placement scope in stored order, breakdown stories excluded
pub async fn scope(store: &InMemoryStore, step_id: Uuid, release_id: Option<Uuid>) -> Vec<Story> {
    store
        .list_stories(&StoryFilter::step(step_id).in_release(release_id))
        .await
        .expect("list scope")
        .into_iter()
        .filter(|s| !crate::breakdown::codec::is_any_breakdown(s))
        .collect()
}
