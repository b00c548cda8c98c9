//! EntityStore trait definition
//!
//! Abstract interface over the document store holding the story map.
//! Every call is scoped to the current session's user by the implementation;
//! access violations are reported as [`crate::error::AccessError`] inside the
//! returned `anyhow::Error`.

use crate::store::models::*;
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Owner-scoped CRUD and ordered list queries over the story map collections.
///
/// `get_*`/`update_*` return `Ok(None)` and `delete_*` returns `Ok(false)` when
/// the record does not exist. List queries return records ordered by `order`
/// ascending unless documented otherwise.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ========================================================================
    // Epic operations
    // ========================================================================

    /// Create an epic, returning the stored record
    async fn create_epic(&self, epic: Epic) -> Result<Epic>;

    /// Get an epic by ID
    async fn get_epic(&self, id: Uuid) -> Result<Option<Epic>>;

    /// List the session user's epics, newest first
    async fn list_epics(&self) -> Result<Vec<Epic>>;

    /// Delete a single epic record (no cascade)
    async fn delete_epic(&self, id: Uuid) -> Result<bool>;

    // ========================================================================
    // Journey operations
    // ========================================================================

    async fn create_journey(&self, journey: UserJourney) -> Result<UserJourney>;

    async fn get_journey(&self, id: Uuid) -> Result<Option<UserJourney>>;

    /// List journeys of an epic
    async fn list_journeys(&self, epic_id: Uuid) -> Result<Vec<UserJourney>>;

    async fn update_journey(&self, id: Uuid, patch: NodePatch) -> Result<Option<UserJourney>>;

    async fn delete_journey(&self, id: Uuid) -> Result<bool>;

    // ========================================================================
    // Step operations
    // ========================================================================

    async fn create_step(&self, step: Step) -> Result<Step>;

    async fn get_step(&self, id: Uuid) -> Result<Option<Step>>;

    /// List steps of a journey
    async fn list_steps(&self, journey_id: Uuid) -> Result<Vec<Step>>;

    async fn update_step(&self, id: Uuid, patch: NodePatch) -> Result<Option<Step>>;

    async fn delete_step(&self, id: Uuid) -> Result<bool>;

    // ========================================================================
    // Release operations
    // ========================================================================

    async fn create_release(&self, release: Release) -> Result<Release>;

    async fn get_release(&self, id: Uuid) -> Result<Option<Release>>;

    /// List releases of a journey
    async fn list_releases(&self, journey_id: Uuid) -> Result<Vec<Release>>;

    async fn update_release(&self, id: Uuid, patch: NodePatch) -> Result<Option<Release>>;

    async fn delete_release(&self, id: Uuid) -> Result<bool>;

    // ========================================================================
    // Story operations
    // ========================================================================

    async fn create_story(&self, story: Story) -> Result<Story>;

    async fn get_story(&self, id: Uuid) -> Result<Option<Story>>;

    /// List stories matching every predicate of the filter
    async fn list_stories(&self, filter: &StoryFilter) -> Result<Vec<Story>>;

    async fn update_story(&self, id: Uuid, patch: StoryPatch) -> Result<Option<Story>>;

    async fn delete_story(&self, id: Uuid) -> Result<bool>;
}
