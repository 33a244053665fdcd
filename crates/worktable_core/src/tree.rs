use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type NodeId = String;

/// Closed set of work item kinds. Kinds only affect rendering; every kind
/// participates in the same structural operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Epic,
    Feature,
    Item,
    Task,
    Group,
}

impl ItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Epic => "Epic",
            ItemKind::Feature => "Feature",
            ItemKind::Item => "Backlog Item",
            ItemKind::Task => "Task",
            ItemKind::Group => "Group",
        }
    }
}

/// One record in the hierarchy, with ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: NodeId,
    /// Dotted position label ("1.2.3"). Derived, not authoritative; rebuilt
    /// by [`Forest::recalculate_orders`] after every structural mutation.
    #[serde(default)]
    pub order: String,
    pub kind: ItemKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WorkItem>,
}

impl WorkItem {
    pub fn new(id: impl Into<NodeId>, kind: ItemKind, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order: String::new(),
            kind,
            title: title.into(),
            fields: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn child(mut self, child: WorkItem) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl Into<Vec<WorkItem>>) -> Self {
        self.children.extend(children.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The resolved location of a node: the id of the parent owning its sibling
/// array (`None` for root level) and the index within that array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    pub parent_id: Option<NodeId>,
    pub index: usize,
}

impl NodePath {
    /// Whether two paths point into the same owning sibling array.
    #[inline]
    pub fn same_siblings(&self, other: &NodePath) -> bool {
        self.parent_id == other.parent_id
    }
}

/// A node spliced out of the forest, with enough context to put it back.
#[derive(Debug, Clone)]
pub struct Removed {
    pub item: WorkItem,
    pub parent_id: Option<NodeId>,
    pub index: usize,
}

/// Ordered collection of root work items. The forest exclusively owns every
/// reachable node; no node appears under two parents, and ids are unique
/// across all depths.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forest {
    #[serde(default)]
    pub items: Vec<WorkItem>,
}

impl Forest {
    pub fn new(items: impl Into<Vec<WorkItem>>) -> Self {
        let mut forest = Self {
            items: items.into(),
        };
        forest.recalculate_orders();
        forest
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Depth-first pre-order search. Absence is a no-op signal for callers,
    /// never an error.
    pub fn find_path(&self, id: &str) -> Option<NodePath> {
        find_path(&self.items, id, None)
    }

    pub fn node(&self, id: &str) -> Option<&WorkItem> {
        find_node(&self.items, id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut WorkItem> {
        find_node_mut(&mut self.items, id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Ids of the ancestors of `id`, root first, nearest parent last.
    pub fn parent_chain(&self, id: &str) -> Option<Vec<NodeId>> {
        let mut chain = Vec::new();
        collect_chain(&self.items, id, &mut chain).then_some(chain)
    }

    /// Splice out the node with `id`, wherever it lives.
    pub fn remove(&mut self, id: &str) -> Option<Removed> {
        remove_recursive(&mut self.items, id, None)
    }

    /// Insert `item` at `index` under `parent_id` (`None` = root level),
    /// shifting subsequent siblings. Hands the item back when the parent
    /// cannot be resolved so the caller can restore prior state.
    pub fn insert(
        &mut self,
        parent_id: Option<&str>,
        index: usize,
        item: WorkItem,
    ) -> Result<(), WorkItem> {
        let Some(siblings) = self.siblings_mut(parent_id) else {
            return Err(item);
        };
        let ix = index.min(siblings.len());
        siblings.insert(ix, item);
        Ok(())
    }

    pub(crate) fn siblings_mut(&mut self, parent_id: Option<&str>) -> Option<&mut Vec<WorkItem>> {
        match parent_id {
            None => Some(&mut self.items),
            Some(parent_id) => self.node_mut(parent_id).map(|node| &mut node.children),
        }
    }

    /// Rebuild every `order` label top-down. Must run after any structural
    /// mutation before the forest is considered valid; idempotent.
    pub fn recalculate_orders(&mut self) {
        recalculate(&mut self.items, "");
    }

    /// Every id in the forest, pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        collect_ids(&self.items, &mut ids);
        ids
    }
}

/// Whether `id` names `item` itself or any node in its subtree.
pub fn subtree_contains(item: &WorkItem, id: &str) -> bool {
    if item.id == id {
        return true;
    }
    item.children.iter().any(|child| subtree_contains(child, id))
}

fn find_path(items: &[WorkItem], id: &str, parent_id: Option<&NodeId>) -> Option<NodePath> {
    for (index, node) in items.iter().enumerate() {
        if node.id == id {
            return Some(NodePath {
                parent_id: parent_id.cloned(),
                index,
            });
        }
        if let Some(found) = find_path(&node.children, id, Some(&node.id)) {
            return Some(found);
        }
    }
    None
}

fn find_node<'a>(items: &'a [WorkItem], id: &str) -> Option<&'a WorkItem> {
    for node in items {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_node_mut<'a>(items: &'a mut [WorkItem], id: &str) -> Option<&'a mut WorkItem> {
    for node in items.iter_mut() {
        if node.id == id {
            return Some(node);
        }
        if let Some(found) = find_node_mut(&mut node.children, id) {
            return Some(found);
        }
    }
    None
}

fn collect_chain(items: &[WorkItem], id: &str, chain: &mut Vec<NodeId>) -> bool {
    for node in items {
        if node.id == id {
            return true;
        }
        chain.push(node.id.clone());
        if collect_chain(&node.children, id, chain) {
            return true;
        }
        chain.pop();
    }
    false
}

fn remove_recursive(
    items: &mut Vec<WorkItem>,
    id: &str,
    parent_id: Option<NodeId>,
) -> Option<Removed> {
    for index in 0..items.len() {
        if items[index].id == id {
            let item = items.remove(index);
            return Some(Removed {
                item,
                parent_id,
                index,
            });
        }
    }

    for index in 0..items.len() {
        let parent_id = items[index].id.clone();
        if let Some(removed) = remove_recursive(&mut items[index].children, id, Some(parent_id)) {
            return Some(removed);
        }
    }

    None
}

fn recalculate(items: &mut [WorkItem], parent_order: &str) {
    for (ix, item) in items.iter_mut().enumerate() {
        let order = if parent_order.is_empty() {
            (ix + 1).to_string()
        } else {
            format!("{parent_order}.{}", ix + 1)
        };
        recalculate(&mut item.children, &order);
        item.order = order;
    }
}

fn collect_ids(items: &[WorkItem], ids: &mut Vec<NodeId>) {
    for node in items {
        ids.push(node.id.clone());
        collect_ids(&node.children, ids);
    }
}
