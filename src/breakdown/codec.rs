//! Breakdown tag encoding and column grouping
//!
//! A breakdown story carries an explicit [`BreakdownRef`]. The same relation is
//! also written into its description as `[SPIDR:<parent>:COL:<column>]` so that
//! records produced by older writers, which only carry the tag, are recognized
//! on load. Every predicate here accepts either form.

use crate::placement::ordering::sort_siblings;
use crate::store::models::{BreakdownRef, Story};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::warn;
use uuid::Uuid;

/// Substring every breakdown tag starts with
pub const TAG_PREFIX: &str = "[SPIDR:";

/// Highest column index honored when grouping; larger values are treated as malformed.
pub const MAX_COLUMN_INDEX: u32 = 255;

static COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[SPIDR:[^\]]+:COL:(\d+)\]").expect("static breakdown column pattern")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[SPIDR:([^\]:]+):COL:(\d+)\]").expect("static breakdown tag pattern")
});

/// One THEN-column of a breakdown: alternative stories ordered by `order`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownColumn {
    pub index: u32,
    pub stories: Vec<Story>,
}

/// Tag literal attached to a breakdown story's description
pub fn encode(parent_id: Uuid, column: u32) -> String {
    format!("{TAG_PREFIX}{parent_id}:COL:{column}]")
}

/// Parse a well-formed tag whose parent is a story id
pub fn parse_tag(description: &str) -> Option<BreakdownRef> {
    let caps = TAG_RE.captures(description)?;
    let parent_story_id = caps.get(1)?.as_str().parse().ok()?;
    let column = caps.get(2)?.as_str().parse().ok()?;
    Some(BreakdownRef {
        parent_story_id,
        column,
    })
}

/// True if the description tags a breakdown of `parent`
pub fn description_is_breakdown_of(description: &str, parent: &str) -> bool {
    description.contains(&format!("{TAG_PREFIX}{parent}:COL:"))
}

/// Column named by a description's tag; 0 when absent, malformed or out of range
pub fn description_column(description: &str) -> u32 {
    let Some(digits) = COLUMN_RE.captures(description).and_then(|caps| caps.get(1)) else {
        return 0;
    };
    match digits.as_str().parse::<u32>() {
        Ok(column) => clamp_column(column),
        Err(_) => {
            warn!(column = digits.as_str(), "Breakdown column does not fit, using column 0");
            0
        }
    }
}

/// Out-of-range columns fold into column 0
fn clamp_column(column: u32) -> u32 {
    if column > MAX_COLUMN_INDEX {
        warn!(column, max = MAX_COLUMN_INDEX, "Breakdown column out of range, using column 0");
        0
    } else {
        column
    }
}

/// Breakdown relation of a story, explicit field first
pub fn breakdown_ref(story: &Story) -> Option<BreakdownRef> {
    story.breakdown.or_else(|| parse_tag(&story.description))
}

pub fn is_breakdown_of(story: &Story, parent_id: Uuid) -> bool {
    match story.breakdown {
        Some(r) => r.parent_story_id == parent_id,
        None => description_is_breakdown_of(&story.description, &parent_id.to_string()),
    }
}

pub fn is_any_breakdown(story: &Story) -> bool {
    story.breakdown.is_some() || story.description.contains(TAG_PREFIX)
}

pub fn column_of(story: &Story) -> u32 {
    match story.breakdown {
        Some(r) => clamp_column(r.column),
        None => description_column(&story.description),
    }
}

/// Group the breakdown stories of `parent_id` into a dense list of columns.
///
/// Columns run from 0 to the highest index seen, with empty columns for gaps;
/// with no breakdown stories the result is a single empty column 0.
pub fn decode_columns<'a, I>(stories: I, parent_id: Uuid) -> Vec<BreakdownColumn>
where
    I: IntoIterator<Item = &'a Story>,
{
    let mut grouped: BTreeMap<u32, Vec<Story>> = BTreeMap::new();
    for story in stories {
        if is_breakdown_of(story, parent_id) {
            grouped.entry(column_of(story)).or_default().push(story.clone());
        }
    }

    for column in grouped.values_mut() {
        sort_siblings(column);
    }

    let max = grouped.keys().next_back().copied().unwrap_or(0);
    (0..=max)
        .map(|index| BreakdownColumn {
            index,
            stories: grouped.remove(&index).unwrap_or_default(),
        })
        .collect()
}
