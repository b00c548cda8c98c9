//! Cascade plan: an arena of planned actions linked by parent index

use crate::store::models::EntityKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A record addressed by its collection and id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl NodeRef {
    pub fn new(kind: EntityKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Delete,
    /// Move a story back to the backlog
    Detach,
}

#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub node: NodeRef,
    pub action: PlannedAction,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// False when listing this node's children failed; the node must then be kept
    pub enumerated: bool,
}

/// Every action a cascade will take, rooted at the target (index 0)
#[derive(Debug, Clone)]
pub struct CascadePlan {
    entries: Vec<PlanEntry>,
}

impl CascadePlan {
    pub fn new(target: NodeRef) -> Self {
        Self {
            entries: vec![PlanEntry {
                node: target,
                action: PlannedAction::Delete,
                parent: None,
                children: Vec::new(),
                enumerated: true,
            }],
        }
    }

    pub fn root(&self) -> &PlanEntry {
        &self.entries[0]
    }

    pub fn entry(&self, index: usize) -> &PlanEntry {
        &self.entries[index]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an action under `parent`, returning its index
    pub fn push(&mut self, parent: usize, node: NodeRef, action: PlannedAction) -> usize {
        let index = self.entries.len();
        self.entries.push(PlanEntry {
            node,
            action,
            parent: Some(parent),
            children: Vec::new(),
            enumerated: true,
        });
        self.entries[parent].children.push(index);
        index
    }

    pub fn mark_unenumerated(&mut self, index: usize) {
        self.entries[index].enumerated = false;
    }

    /// Execution order: children before their parent, siblings in insertion order
    pub fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.entries.len());
        let mut stack = vec![(0usize, false)];
        while let Some((index, expanded)) = stack.pop() {
            if expanded {
                order.push(index);
                continue;
            }
            stack.push((index, true));
            for child in self.entries[index].children.iter().rev() {
                stack.push((*child, false));
            }
        }
        order
    }

    /// Number of planned actions per kind, for logging
    pub fn count(&self, kind: EntityKind) -> usize {
        self.entries.iter().filter(|e| e.node.kind == kind).count()
    }
}
