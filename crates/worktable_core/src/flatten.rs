use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tree::{Forest, NodeId, WorkItem};

/// Per-node expanded/collapsed state over a global default. Entries for ids
/// that no longer exist in the forest are simply ignored; they are not
/// cleaned up eagerly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionState {
    default_expanded: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    overrides: HashMap<NodeId, bool>,
}

impl Default for ExpansionState {
    fn default() -> Self {
        Self::all_expanded()
    }
}

impl ExpansionState {
    pub fn all_expanded() -> Self {
        Self {
            default_expanded: true,
            overrides: HashMap::new(),
        }
    }

    pub fn all_collapsed() -> Self {
        Self {
            default_expanded: false,
            overrides: HashMap::new(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.overrides
            .get(id)
            .copied()
            .unwrap_or(self.default_expanded)
    }

    pub fn set_expanded(&mut self, id: impl Into<NodeId>, expanded: bool) {
        self.overrides.insert(id.into(), expanded);
    }

    /// Flip one node and return its new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        let next = !self.is_expanded(id);
        self.overrides.insert(id.to_string(), next);
        next
    }

    /// Drop every override, falling back to the global default.
    pub fn reset(&mut self) {
        self.overrides.clear();
    }
}

/// One visible row of the flattened tree. A derived projection, rebuilt from
/// scratch on every forest or expansion change; never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRow {
    pub item: WorkItem,
    pub depth: usize,
    /// Ancestor ids, root first, nearest parent last.
    pub parent_chain: Vec<NodeId>,
}

impl VisibleRow {
    #[inline]
    pub fn id(&self) -> &str {
        &self.item.id
    }

    #[inline]
    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_chain.last()
    }
}

/// Pre-order flatten of the forest honoring `expansion`: a node's children
/// follow it only while the node is expanded. The result order is exactly
/// the rendering order, and drag indices are defined against it.
pub fn flatten(forest: &Forest, expansion: &ExpansionState) -> Vec<VisibleRow> {
    let mut rows = Vec::new();
    let mut chain = Vec::new();
    walk(&forest.items, expansion, &mut chain, &mut rows);
    rows
}

fn walk(
    items: &[WorkItem],
    expansion: &ExpansionState,
    chain: &mut Vec<NodeId>,
    rows: &mut Vec<VisibleRow>,
) {
    for item in items {
        rows.push(VisibleRow {
            item: item.clone(),
            depth: chain.len(),
            parent_chain: chain.clone(),
        });
        if !item.children.is_empty() && expansion.is_expanded(&item.id) {
            chain.push(item.id.clone());
            walk(&item.children, expansion, chain, rows);
            chain.pop();
        }
    }
}
