//! Story map assembly: reads an epic's hierarchy into display views

use super::models::*;
use crate::breakdown::codec;
use crate::error::EngineError;
use crate::placement::ordering::sort_siblings;
use crate::store::models::{EntityKind, Release, Step, StoryFilter, UserJourney};
use crate::store::traits::EntityStore;
use futures::future::{try_join, try_join_all};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub struct StoryMapAssembler {
    store: Arc<dyn EntityStore>,
}

impl StoryMapAssembler {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Build the complete map of an epic.
    ///
    /// Journeys, and the steps of each journey, are fetched concurrently.
    /// Breakdown stories never appear in the result.
    pub async fn assemble(&self, epic_id: Uuid) -> Result<CompleteStoryMap, EngineError> {
        let epic = self
            .store
            .get_epic(epic_id)
            .await?
            .ok_or_else(|| EngineError::not_found(EntityKind::Epic, epic_id))?;

        let mut journeys = self.store.list_journeys(epic_id).await?;
        sort_siblings(&mut journeys);
        let journeys = try_join_all(journeys.into_iter().map(|j| self.assemble_journey(j))).await?;

        let map = CompleteStoryMap { epic, journeys };
        debug!(
            epic_id = %epic_id,
            journeys = map.journeys.len(),
            stories = map.story_count(),
            "Story map assembled"
        );
        Ok(map)
    }

    async fn assemble_journey(&self, journey: UserJourney) -> anyhow::Result<JourneyWithSteps> {
        let (mut steps, mut releases) = try_join(
            self.store.list_steps(journey.id),
            self.store.list_releases(journey.id),
        )
        .await?;
        sort_siblings(&mut steps);
        sort_siblings(&mut releases);

        let steps = try_join_all(steps.into_iter().map(|step| self.step_with_stories(step))).await?;
        let lanes = lanes(&steps, &releases);

        Ok(JourneyWithSteps {
            journey,
            steps,
            releases,
            lanes,
        })
    }

    async fn step_with_stories(&self, step: Step) -> anyhow::Result<StepWithStories> {
        let mut stories: Vec<_> = self
            .store
            .list_stories(&StoryFilter::step(step.id))
            .await?
            .into_iter()
            .filter(|s| !codec::is_any_breakdown(s))
            .collect();
        sort_siblings(&mut stories);
        Ok(StepWithStories { step, stories })
    }
}

/// Split each step's stories into release lanes.
///
/// A story whose release is unknown to the journey lands in the backlog lane.
fn lanes(steps: &[StepWithStories], releases: &[Release]) -> Vec<ReleaseLane> {
    let known: HashSet<Uuid> = releases.iter().map(|r| r.id).collect();

    let lane = |keep: &dyn Fn(Option<Uuid>) -> bool| -> Vec<StepWithStories> {
        steps
            .iter()
            .map(|s| StepWithStories {
                step: s.step.clone(),
                stories: s
                    .stories
                    .iter()
                    .filter(|story| keep(story.release_id))
                    .cloned()
                    .collect(),
            })
            .collect()
    };

    let mut lanes: Vec<ReleaseLane> = releases
        .iter()
        .map(|release| ReleaseLane {
            release: Some(release.clone()),
            steps: lane(&|rel| rel == Some(release.id)),
        })
        .collect();
    lanes.push(ReleaseLane {
        release: None,
        steps: lane(&|rel| rel.map_or(true, |id| !known.contains(&id))),
    });
    lanes
}
