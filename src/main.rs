//! Story map demo
//!
//! Seeds an in-memory story map, replays a few edits through the engines and
//! prints the assembled map as JSON.

use anyhow::Result;
use story_map_engine::placement::MoveTarget;
use story_map_engine::storymap::*;
use story_map_engine::{init_tracing, AppState, Config, Priority};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config)?;

    let state = AppState::in_memory(config, "demo");
    let mut events = state.events.subscribe();
    let manager = state.story_map();

    let epic = manager
        .create_epic(CreateEpicRequest {
            name: "Online shop".into(),
            description: Some("Demo story map".into()),
        })
        .await?;
    let journey = manager
        .create_journey(CreateJourneyRequest {
            epic_id: epic.id,
            name: "Buy a product".into(),
            description: None,
            order: None,
        })
        .await?;
    let release = manager
        .create_release(CreateReleaseRequest {
            journey_id: journey.id,
            name: "MVP".into(),
            description: None,
            order: None,
        })
        .await?;

    let mut steps = Vec::new();
    for name in ["Find", "Compare", "Pay"] {
        steps.push(
            manager
                .create_step(CreateStepRequest {
                    journey_id: journey.id,
                    name: name.into(),
                    description: None,
                    order: None,
                })
                .await?,
        );
    }

    let mut stories = Vec::new();
    for (title, priority) in [
        ("Search by name", Priority::Must),
        ("Filter by price", Priority::Should),
        ("Voice search", Priority::Could),
    ] {
        stories.push(
            manager
                .create_story(CreateStoryRequest {
                    step_id: steps[0].id,
                    release_id: None,
                    title: title.into(),
                    description: None,
                    priority: Some(priority),
                    order: None,
                })
                .await?,
        );
    }

    // Drag "Voice search" above "Search by name": it is promoted to must
    manager
        .moved_story(stories[2].id, MoveTarget::story(stories[0].id))
        .await?;
    manager
        .update_story_release(stories[0].id, Some(release.id))
        .await?;
    manager
        .create_breakdown_story(stories[1].id, 0, "Filter by brand", Priority::Should)
        .await?;
    manager
        .delete_node(story_map_engine::store::EntityKind::Step, steps[2].id)
        .await?;

    let mut received = 0;
    while events.try_recv().is_ok() {
        received += 1;
    }
    info!(events = received, "Demo edits applied");

    let map = manager.assemble_story_map(epic.id).await?;
    println!("{}", serde_json::to_string_pretty(&map)?);
    Ok(())
}
