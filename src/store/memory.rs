//! In-memory implementation of EntityStore.
//!
//! Keeps every collection in a `tokio::sync::RwLock<HashMap<Uuid, _>>` and
//! enforces owner scoping against the signed-in session user. Used by the
//! test-suite and by embedders that do not need durable storage.
//!
//! Writes to (and child listings of) ids registered with [`InMemoryStore::fail_on`]
//! return an error, which lets callers exercise partial-failure paths.

use crate::error::AccessError;
use crate::store::models::*;
use crate::store::traits::EntityStore;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Common accessors the generic helpers below need
trait Record: Clone {
    const KIND: EntityKind;
    fn id(&self) -> Uuid;
    fn owner(&self) -> &str;
    fn set_owner(&mut self, owner: &str);
    fn sort_key(&self) -> (u32, DateTime<Utc>, Uuid);
}

macro_rules! impl_record {
    ($ty:ty, $kind:expr, |$r:ident| $order:expr) => {
        impl Record for $ty {
            const KIND: EntityKind = $kind;
            fn id(&self) -> Uuid {
                self.id
            }
            fn owner(&self) -> &str {
                &self.user_id
            }
            fn set_owner(&mut self, owner: &str) {
                self.user_id = owner.to_string();
            }
            fn sort_key(&self) -> (u32, DateTime<Utc>, Uuid) {
                let $r = self;
                ($order, self.created_at, self.id)
            }
        }
    };
}

impl_record!(Epic, EntityKind::Epic, |_r| 0);
impl_record!(UserJourney, EntityKind::Journey, |r| r.order);
impl_record!(Step, EntityKind::Step, |r| r.order);
impl_record!(Release, EntityKind::Release, |r| r.order);
impl_record!(Story, EntityKind::Story, |r| r.order);

fn apply_node_patch(name: &mut String, description: &mut String, order: &mut u32, patch: &NodePatch) {
    if let Some(n) = &patch.name {
        *name = n.clone();
    }
    if let Some(d) = &patch.description {
        *description = d.clone();
    }
    if let Some(o) = patch.order {
        *order = o;
    }
}

/// In-memory, owner-scoped entity store.
///
/// # Example
///
/// ```rust
/// use story_map_engine::store::{EntityStore, Epic, InMemoryStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new("alice");
/// let epic = store.create_epic(Epic::new("Checkout", "")).await.unwrap();
/// assert!(store.get_epic(epic.id).await.unwrap().is_some());
///
/// // Another user is refused
/// store.set_session(Some("bob")).await;
/// assert!(store.get_epic(epic.id).await.is_err());
/// assert!(store.list_epics().await.unwrap().is_empty());
/// # });
/// ```
pub struct InMemoryStore {
    session: RwLock<Option<String>>,
    pub epics: RwLock<HashMap<Uuid, Epic>>,
    pub journeys: RwLock<HashMap<Uuid, UserJourney>>,
    pub steps: RwLock<HashMap<Uuid, Step>>,
    pub releases: RwLock<HashMap<Uuid, Release>>,
    pub stories: RwLock<HashMap<Uuid, Story>>,
    faults: RwLock<HashSet<Uuid>>,
}

impl InMemoryStore {
    /// Create an empty store with `user` signed in.
    pub fn new(user: impl Into<String>) -> Self {
        Self::with_session(Some(user.into()))
    }

    /// Create an empty store with no session
    pub fn anonymous() -> Self {
        Self::with_session(None)
    }

    fn with_session(session: Option<String>) -> Self {
        Self {
            session: RwLock::new(session),
            epics: RwLock::new(HashMap::new()),
            journeys: RwLock::new(HashMap::new()),
            steps: RwLock::new(HashMap::new()),
            releases: RwLock::new(HashMap::new()),
            stories: RwLock::new(HashMap::new()),
            faults: RwLock::new(HashSet::new()),
        }
    }

    /// Switch the session user (`None` signs out)
    pub async fn set_session(&self, user: Option<&str>) {
        *self.session.write().await = user.map(str::to_string);
    }

    /// Make every write to `id`, and every child listing keyed by `id`, fail.
    pub async fn fail_on(&self, id: Uuid) {
        self.faults.write().await.insert(id);
    }

    /// Stop failing requests for `id`
    pub async fn heal(&self, id: Uuid) {
        self.faults.write().await.remove(&id);
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    async fn session_user(&self) -> Result<String> {
        match self.session.read().await.as_ref() {
            Some(user) => Ok(user.clone()),
            None => Err(AccessError::NotAuthenticated.into()),
        }
    }

    async fn check_fault(&self, kind: EntityKind, id: Uuid) -> Result<()> {
        if self.faults.read().await.contains(&id) {
            return Err(anyhow!("injected storage failure on {} {}", kind, id));
        }
        Ok(())
    }

    async fn insert<T: Record>(&self, map: &RwLock<HashMap<Uuid, T>>, mut record: T) -> Result<T> {
        let user = self.session_user().await?;
        record.set_owner(&user);
        map.write().await.insert(record.id(), record.clone());
        Ok(record)
    }

    async fn fetch<T: Record>(&self, map: &RwLock<HashMap<Uuid, T>>, id: Uuid) -> Result<Option<T>> {
        let user = self.session_user().await?;
        match map.read().await.get(&id) {
            None => Ok(None),
            Some(r) if r.owner() != user => Err(AccessError::Unauthorized { kind: T::KIND, id }.into()),
            Some(r) => Ok(Some(r.clone())),
        }
    }

    async fn list_where<T, F>(&self, map: &RwLock<HashMap<Uuid, T>>, keep: F) -> Result<Vec<T>>
    where
        T: Record,
        F: Fn(&T) -> bool,
    {
        let user = self.session_user().await?;
        let mut out: Vec<T> = map
            .read()
            .await
            .values()
            .filter(|r| r.owner() == user && keep(*r))
            .cloned()
            .collect();
        out.sort_by_key(|r| r.sort_key());
        Ok(out)
    }

    async fn modify<T, F>(&self, map: &RwLock<HashMap<Uuid, T>>, id: Uuid, edit: F) -> Result<Option<T>>
    where
        T: Record,
        F: FnOnce(&mut T),
    {
        let user = self.session_user().await?;
        self.check_fault(T::KIND, id).await?;
        let mut guard = map.write().await;
        match guard.get_mut(&id) {
            None => Ok(None),
            Some(r) if r.owner() != user => Err(AccessError::Unauthorized { kind: T::KIND, id }.into()),
            Some(r) => {
                edit(r);
                Ok(Some(r.clone()))
            }
        }
    }

    async fn remove<T: Record>(&self, map: &RwLock<HashMap<Uuid, T>>, id: Uuid) -> Result<bool> {
        let user = self.session_user().await?;
        self.check_fault(T::KIND, id).await?;
        let mut guard = map.write().await;
        let foreign = match guard.get(&id) {
            None => return Ok(false),
            Some(r) => r.owner() != user,
        };
        if foreign {
            return Err(AccessError::Unauthorized { kind: T::KIND, id }.into());
        }
        Ok(guard.remove(&id).is_some())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("local")
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    // ========================================================================
    // Epic operations
    // ========================================================================

    async fn create_epic(&self, epic: Epic) -> Result<Epic> {
        self.insert(&self.epics, epic).await
    }

    async fn get_epic(&self, id: Uuid) -> Result<Option<Epic>> {
        self.fetch(&self.epics, id).await
    }

    async fn list_epics(&self) -> Result<Vec<Epic>> {
        let mut epics = self.list_where(&self.epics, |_| true).await?;
        epics.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(epics)
    }

    async fn delete_epic(&self, id: Uuid) -> Result<bool> {
        self.remove(&self.epics, id).await
    }

    // ========================================================================
    // Journey operations
    // ========================================================================

    async fn create_journey(&self, journey: UserJourney) -> Result<UserJourney> {
        self.insert(&self.journeys, journey).await
    }

    async fn get_journey(&self, id: Uuid) -> Result<Option<UserJourney>> {
        self.fetch(&self.journeys, id).await
    }

    async fn list_journeys(&self, epic_id: Uuid) -> Result<Vec<UserJourney>> {
        self.check_fault(EntityKind::Epic, epic_id).await?;
        self.list_where(&self.journeys, |j| j.epic_id == epic_id).await
    }

    async fn update_journey(&self, id: Uuid, patch: NodePatch) -> Result<Option<UserJourney>> {
        self.modify(&self.journeys, id, |j| {
            apply_node_patch(&mut j.name, &mut j.description, &mut j.order, &patch)
        })
        .await
    }

    async fn delete_journey(&self, id: Uuid) -> Result<bool> {
        self.remove(&self.journeys, id).await
    }

    // ========================================================================
    // Step operations
    // ========================================================================

    async fn create_step(&self, step: Step) -> Result<Step> {
        self.insert(&self.steps, step).await
    }

    async fn get_step(&self, id: Uuid) -> Result<Option<Step>> {
        self.fetch(&self.steps, id).await
    }

    async fn list_steps(&self, journey_id: Uuid) -> Result<Vec<Step>> {
        self.check_fault(EntityKind::Journey, journey_id).await?;
        self.list_where(&self.steps, |s| s.journey_id == journey_id).await
    }

    async fn update_step(&self, id: Uuid, patch: NodePatch) -> Result<Option<Step>> {
        self.modify(&self.steps, id, |s| {
            apply_node_patch(&mut s.name, &mut s.description, &mut s.order, &patch)
        })
        .await
    }

    async fn delete_step(&self, id: Uuid) -> Result<bool> {
        self.remove(&self.steps, id).await
    }

    // ========================================================================
    // Release operations
    // ========================================================================

    async fn create_release(&self, release: Release) -> Result<Release> {
        self.insert(&self.releases, release).await
    }

    async fn get_release(&self, id: Uuid) -> Result<Option<Release>> {
        self.fetch(&self.releases, id).await
    }

    async fn list_releases(&self, journey_id: Uuid) -> Result<Vec<Release>> {
        self.check_fault(EntityKind::Journey, journey_id).await?;
        self.list_where(&self.releases, |r| r.journey_id == journey_id).await
    }

    async fn update_release(&self, id: Uuid, patch: NodePatch) -> Result<Option<Release>> {
        self.modify(&self.releases, id, |r| {
            apply_node_patch(&mut r.name, &mut r.description, &mut r.order, &patch)
        })
        .await
    }

    async fn delete_release(&self, id: Uuid) -> Result<bool> {
        self.remove(&self.releases, id).await
    }

    // ========================================================================
    // Story operations
    // ========================================================================

    async fn create_story(&self, story: Story) -> Result<Story> {
        self.insert(&self.stories, story).await
    }

    async fn get_story(&self, id: Uuid) -> Result<Option<Story>> {
        self.fetch(&self.stories, id).await
    }

    async fn list_stories(&self, filter: &StoryFilter) -> Result<Vec<Story>> {
        if let Some(step_id) = filter.step_id {
            self.check_fault(EntityKind::Step, step_id).await?;
        }
        if let Some(Some(release_id)) = filter.release_id {
            self.check_fault(EntityKind::Release, release_id).await?;
        }
        if let Some(parent_story_id) = filter.parent_story_id {
            self.check_fault(EntityKind::Story, parent_story_id).await?;
        }
        self.list_where(&self.stories, |s| filter.matches(s)).await
    }

    async fn update_story(&self, id: Uuid, patch: StoryPatch) -> Result<Option<Story>> {
        self.modify(&self.stories, id, |s| s.apply(&patch)).await
    }

    async fn delete_story(&self, id: Uuid) -> Result<bool> {
        self.remove(&self.stories, id).await
    }
}
