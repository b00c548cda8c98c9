//! Pure ordering primitives shared by every ordered collection
//!
//! Nothing in here touches the store: callers snapshot a sibling list, run the
//! transformation, and persist the result.

use crate::priority::{most_dominant, Priority};
use crate::store::models::{Release, Step, Story, UserJourney};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A record ranked among its siblings by a 0-based `order`
pub trait Ordered {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn order(&self) -> u32;
    fn set_order(&mut self, order: u32);
}

macro_rules! impl_ordered {
    ($($ty:ty),*) => {
        $(impl Ordered for $ty {
            fn id(&self) -> Uuid {
                self.id
            }
            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }
            fn order(&self) -> u32 {
                self.order
            }
            fn set_order(&mut self, order: u32) {
                self.order = order;
            }
        })*
    };
}

impl_ordered!(UserJourney, Step, Release, Story);

/// Stable array move: the element at `from` ends up at `to` and everything in
/// between shifts by one. Out-of-range indices are clamped to the last slot.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if items.is_empty() {
        return;
    }
    let last = items.len() - 1;
    let from = from.min(last);
    let to = to.min(last);
    if from == to {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

/// Insert `item` at `at` (clamped to append), shifting later elements up.
/// Returns the index actually used.
pub fn insert_item<T>(items: &mut Vec<T>, item: T, at: usize) -> usize {
    let at = at.min(items.len());
    items.insert(at, item);
    at
}

/// Set every element's order to its index; returns the indices that changed.
pub fn renumber<T: Ordered>(items: &mut [T]) -> Vec<usize> {
    let mut changed = Vec::new();
    for (index, item) in items.iter_mut().enumerate() {
        let order = index as u32;
        if item.order() != order {
            item.set_order(order);
            changed.push(index);
        }
    }
    changed
}

/// Sort by `order`, breaking ties by creation time and then id
pub fn sort_siblings<T: Ordered>(items: &mut [T]) {
    items.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then(a.created_at().cmp(&b.created_at()))
            .then(a.id().cmp(&b.id()))
    });
}

/// Move the element identified by `id` to index `to` and renumber the list.
///
/// Returns `(id, order)` for every element whose order changed, or `None`
/// when `id` is not in the list.
pub fn reorder_by_id<T: Ordered>(items: &mut Vec<T>, id: Uuid, to: usize) -> Option<Vec<(Uuid, u32)>> {
    let from = items.iter().position(|item| item.id() == id)?;
    move_item(items, from, to);
    let changed = renumber(items);
    Some(
        changed
            .into_iter()
            .map(|index| (items[index].id(), items[index].order()))
            .collect(),
    )
}

/// True if the orders are exactly `0..len` (in any arrangement)
pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    let mut orders: Vec<u32> = items.iter().map(Ordered::order).collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(i, o)| *o == i as u32)
}

/// Upgrade every story that sits above a more dominant one.
///
/// Walks from the bottom of the list to the top carrying the most dominant
/// priority seen strictly below the current position; a story that it
/// dominates adopts it. Priorities only ever move toward `must`.
/// Returns the indices that were upgraded.
pub fn cascade_priorities(stories: &mut [Story]) -> Vec<usize> {
    let mut upgraded = Vec::new();
    let mut below: Option<Priority> = None;
    for index in (0..stories.len()).rev() {
        let own = stories[index].priority;
        if let Some(best) = below.filter(|best| best.dominates(own)) {
            stories[index].priority = best;
            upgraded.push(index);
        }
        below = most_dominant(below.into_iter().chain([own]));
    }
    upgraded.reverse();
    upgraded
}
