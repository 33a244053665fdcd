use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::drag::DropIntent;
use crate::tree::{Forest, ItemKind, NodeId, Removed, WorkItem, subtree_contains};

/// Outcome of a completed drop gesture. Every failure mode (stale id, no
/// structurally valid level, declined confirmation) collapses to
/// [`DropOutcome::Ignored`] with the forest untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Reordered,
    Grouped(NodeId),
    Ignored,
}

/// Confirmation collaborator for the group gesture. Implementations block
/// the interaction (modally, from the engine's point of view) and return the
/// group title, or `None` when the user declined or never answered.
pub trait GroupPrompt {
    fn confirm_group(&mut self, dragged: &WorkItem, target: &WorkItem) -> Option<String>;
}

/// Always confirms with a fixed title. Useful in tests and headless hosts.
#[derive(Debug, Clone)]
pub struct AutoConfirm(pub String);

impl GroupPrompt for AutoConfirm {
    fn confirm_group(&mut self, _dragged: &WorkItem, _target: &WorkItem) -> Option<String> {
        Some(self.0.clone())
    }
}

impl Forest {
    /// Project `target_id` to the nearest ancestor that shares the dragged
    /// node's sibling array, so a drop on a nested descendant snaps to the
    /// closest structurally valid level.
    ///
    /// Returns the effective target id, or `None` when no such level exists:
    /// the target is inside the dragged node's own subtree, or lives in a
    /// branch with no ancestor at the dragged node's level.
    pub fn project_target(&self, dragged_id: &str, target_id: &str) -> Option<NodeId> {
        let dragged_path = self.find_path(dragged_id)?;
        let target_path = self.find_path(target_id)?;

        if target_path.same_siblings(&dragged_path) {
            return Some(target_id.to_string());
        }

        let chain = self.parent_chain(target_id)?;
        for ancestor_id in chain.iter().rev() {
            if ancestor_id == dragged_id {
                // Target lives inside the dragged subtree; moving relative
                // to it would detach the target from its own ancestor.
                return None;
            }
            let ancestor_path = self.find_path(ancestor_id)?;
            if ancestor_path.same_siblings(&dragged_path) {
                return Some(ancestor_id.clone());
            }
        }
        None
    }

    /// Move `dragged_id` above or below `target_id` within one sibling
    /// array. Cross-parent targets are first projected with
    /// [`Forest::project_target`]; anything that cannot be projected leaves
    /// the forest unchanged. Returns whether the forest changed.
    pub fn reorder(&mut self, dragged_id: &str, target_id: &str, intent: DropIntent) -> bool {
        if intent == DropIntent::Group || dragged_id == target_id {
            return false;
        }
        let Some(effective_target) = self.project_target(dragged_id, target_id) else {
            return false;
        };

        let Some(removed) = self.remove(dragged_id) else {
            return false;
        };
        // Sibling indices shifted with the removal; resolve the target again
        // in the post-removal forest.
        let Some(target_path) = self.find_path(&effective_target) else {
            self.restore(removed);
            return false;
        };

        let index = match intent {
            DropIntent::ReorderAbove => target_path.index,
            _ => target_path.index + 1,
        };
        match self.insert(target_path.parent_id.as_deref(), index, removed.item) {
            Ok(()) => {
                self.recalculate_orders();
                true
            }
            Err(item) => {
                self.restore(Removed {
                    item,
                    parent_id: removed.parent_id,
                    index: removed.index,
                });
                false
            }
        }
    }

    /// Wrap `target_id` and `dragged_id` under a new synthetic group node
    /// that takes over the target's position in its owner array. The caller
    /// has already obtained confirmation; `title` must be non-empty.
    ///
    /// Returns the id of the new group, or `None` with the forest unchanged.
    pub fn group(&mut self, dragged_id: &str, target_id: &str, title: &str) -> Option<NodeId> {
        if title.trim().is_empty() || dragged_id == target_id {
            return None;
        }
        if !self.contains(target_id) {
            return None;
        }
        // Grouping with a node of the dragged subtree would nest the subtree
        // inside itself.
        if self
            .node(dragged_id)
            .is_none_or(|item| subtree_contains(item, target_id))
        {
            return None;
        }

        let removed = self.remove(dragged_id)?;
        let Some(target_path) = self.find_path(target_id) else {
            self.restore(removed);
            return None;
        };
        let Some(siblings) = self.siblings_mut(target_path.parent_id.as_deref()) else {
            self.restore(removed);
            return None;
        };

        let target = siblings.remove(target_path.index);
        let mut group = WorkItem::new(next_group_id(), ItemKind::Group, title.trim());
        // The group inherits the target's slot; the label is corrected by
        // the recompute below anyway.
        group.order = target.order.clone();
        group.children = vec![target, removed.item];
        let group_id = group.id.clone();
        siblings.insert(target_path.index, group);

        self.recalculate_orders();
        Some(group_id)
    }

    /// Resolve a completed drop gesture: reorders apply directly, the group
    /// intent consults `prompt` for confirmation and a title first.
    pub fn apply_drop(
        &mut self,
        dragged_id: &str,
        target_id: &str,
        intent: DropIntent,
        prompt: &mut dyn GroupPrompt,
    ) -> DropOutcome {
        match intent {
            DropIntent::ReorderAbove | DropIntent::ReorderBelow => {
                if self.reorder(dragged_id, target_id, intent) {
                    DropOutcome::Reordered
                } else {
                    DropOutcome::Ignored
                }
            }
            DropIntent::Group => {
                let title = {
                    let (Some(dragged), Some(target)) =
                        (self.node(dragged_id), self.node(target_id))
                    else {
                        return DropOutcome::Ignored;
                    };
                    match prompt.confirm_group(dragged, target) {
                        Some(title) => title,
                        None => return DropOutcome::Ignored,
                    }
                };
                match self.group(dragged_id, target_id, &title) {
                    Some(group_id) => DropOutcome::Grouped(group_id),
                    None => DropOutcome::Ignored,
                }
            }
        }
    }

    /// Update one scalar field on a node. Structural data (`children`,
    /// `order`, `id`) is not editable this way. Returns whether a node was
    /// found and updated.
    pub fn update_field(&mut self, id: &str, field: &str, value: serde_json::Value) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.fields.insert(field.to_string(), value);
        true
    }

    pub fn set_title(&mut self, id: &str, title: impl Into<String>) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.title = title.into();
        true
    }

    fn restore(&mut self, removed: Removed) {
        let parent_id = removed.parent_id.clone();
        let _ = self.insert(parent_id.as_deref(), removed.index, removed.item);
    }
}

/// Fresh, forest-unique id for a synthetic group node: wall-clock nanos plus
/// a process-wide counter so two groups created in the same instant still
/// differ.
fn next_group_id() -> NodeId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("group-{nanos:x}-{seq:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &'static str, children: Vec<WorkItem>) -> WorkItem {
        WorkItem::new(id, ItemKind::Item, id).children(children)
    }

    fn dump(items: &[WorkItem], depth: usize, out: &mut String) {
        for node in items {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&node.id);
            out.push('\n');
            dump(&node.children, depth + 1, out);
        }
    }

    #[test]
    fn projection_snaps_descendant_target_to_sibling_level() {
        // B's child B1 is not a sibling of A; the projection walks up to B.
        let forest = Forest::new(vec![
            item("A", vec![]),
            item("B", vec![item("B1", vec![item("B1a", vec![])])]),
        ]);

        assert_eq!(forest.project_target("A", "B1").as_deref(), Some("B"));
        assert_eq!(forest.project_target("A", "B1a").as_deref(), Some("B"));
        assert_eq!(forest.project_target("A", "B").as_deref(), Some("B"));
    }

    #[test]
    fn projection_rejects_own_descendant() {
        let forest = Forest::new(vec![item(
            "A",
            vec![item("B", vec![item("C", vec![])])],
        )]);

        assert_eq!(forest.project_target("A", "B"), None);
        assert_eq!(forest.project_target("A", "C"), None);
    }

    #[test]
    fn projection_rejects_unrelated_branch() {
        // Dragging B1 (under B) onto A1 (under A): no ancestor of A1 sits in
        // B's child array.
        let forest = Forest::new(vec![
            item("A", vec![item("A1", vec![])]),
            item("B", vec![item("B1", vec![])]),
        ]);

        assert_eq!(forest.project_target("B1", "A1"), None);
    }

    #[test]
    fn reorder_above_moves_within_siblings() {
        let mut forest = Forest::new(vec![
            item("A", vec![]),
            item("B", vec![]),
            item("C", vec![]),
        ]);

        assert!(forest.reorder("C", "A", DropIntent::ReorderAbove));

        let mut s = String::new();
        dump(&forest.items, 0, &mut s);
        assert_eq!(
            s.trim(),
            r#"C
A
B"#
        );
        let orders: Vec<_> = forest.items.iter().map(|n| n.order.as_str()).collect();
        assert_eq!(orders, vec!["1", "2", "3"]);
    }

    #[test]
    fn reorder_below_lands_after_target() {
        let mut forest = Forest::new(vec![
            item("A", vec![]),
            item("B", vec![]),
            item("C", vec![]),
        ]);

        assert!(forest.reorder("A", "B", DropIntent::ReorderBelow));

        let mut s = String::new();
        dump(&forest.items, 0, &mut s);
        assert_eq!(
            s.trim(),
            r#"B
A
C"#
        );
    }

    #[test]
    fn reorder_through_projection_uses_ancestor_slot() {
        let mut forest = Forest::new(vec![
            item("A", vec![]),
            item("B", vec![item("B1", vec![])]),
        ]);

        // Drop A below B1: B1 projects to B, so A lands after B at root.
        assert!(forest.reorder("A", "B1", DropIntent::ReorderBelow));

        let mut s = String::new();
        dump(&forest.items, 0, &mut s);
        assert_eq!(
            s.trim(),
            r#"B
  B1
A"#
        );
    }

    #[test]
    fn reorder_with_no_projection_is_a_no_op() {
        let mut forest = Forest::new(vec![
            item("A", vec![item("A1", vec![])]),
            item("B", vec![item("B1", vec![])]),
        ]);
        let before = forest.clone();

        assert!(!forest.reorder("B1", "A1", DropIntent::ReorderAbove));
        assert_eq!(forest, before);
    }

    #[test]
    fn reorder_onto_own_descendant_is_a_no_op() {
        let mut forest = Forest::new(vec![item(
            "A",
            vec![item("B", vec![item("C", vec![])])],
        )]);
        let before = forest.clone();

        assert!(!forest.reorder("A", "C", DropIntent::ReorderBelow));
        assert_eq!(forest, before);
    }

    #[test]
    fn group_replaces_target_with_group_of_two() {
        let mut forest = Forest::new(vec![
            item("A", vec![]),
            item("B", vec![item("B1", vec![]), item("B2", vec![])]),
        ]);

        let group_id = forest.group("A", "B1", "G1").expect("group created");

        let group = forest.node(&group_id).unwrap();
        assert_eq!(group.kind, ItemKind::Group);
        assert_eq!(group.title, "G1");
        assert_eq!(group.children.len(), 2);
        assert_eq!(group.children[0].id, "B1");
        assert_eq!(group.children[1].id, "A");

        // Orders recompute around the new node.
        assert_eq!(forest.node("B").unwrap().order, "1");
        assert_eq!(group.order, "1.1");
        assert_eq!(forest.node("B1").unwrap().order, "1.1.1");
        assert_eq!(forest.node("A").unwrap().order, "1.1.2");
        assert_eq!(forest.node("B2").unwrap().order, "1.2");

        // Neither participant exists anywhere else.
        let ids = forest.ids();
        assert_eq!(ids.iter().filter(|id| *id == "A").count(), 1);
        assert_eq!(ids.iter().filter(|id| *id == "B1").count(), 1);
    }

    #[test]
    fn group_rejects_empty_title() {
        let mut forest = Forest::new(vec![item("A", vec![]), item("B", vec![])]);
        let before = forest.clone();

        assert_eq!(forest.group("A", "B", ""), None);
        assert_eq!(forest.group("A", "B", "   "), None);
        assert_eq!(forest, before);
    }

    #[test]
    fn group_rejects_own_descendant_target() {
        let mut forest = Forest::new(vec![item("A", vec![item("B", vec![])])]);
        let before = forest.clone();

        assert_eq!(forest.group("A", "B", "G"), None);
        assert_eq!(forest, before);
    }

    #[test]
    fn apply_drop_routes_decline_to_ignored() {
        struct Decline;
        impl GroupPrompt for Decline {
            fn confirm_group(&mut self, _: &WorkItem, _: &WorkItem) -> Option<String> {
                None
            }
        }

        let mut forest = Forest::new(vec![item("A", vec![]), item("B", vec![])]);
        let before = forest.clone();

        let outcome = forest.apply_drop("A", "B", DropIntent::Group, &mut Decline);
        assert_eq!(outcome, DropOutcome::Ignored);
        assert_eq!(forest, before);
    }

    #[test]
    fn apply_drop_with_stale_ids_is_ignored() {
        let mut forest = Forest::new(vec![item("A", vec![])]);
        let before = forest.clone();

        let mut prompt = AutoConfirm("G".into());
        assert_eq!(
            forest.apply_drop("gone", "A", DropIntent::Group, &mut prompt),
            DropOutcome::Ignored
        );
        assert_eq!(
            forest.apply_drop("gone", "A", DropIntent::ReorderAbove, &mut prompt),
            DropOutcome::Ignored
        );
        assert_eq!(forest, before);
    }

    #[test]
    fn update_field_and_title() {
        let mut forest = Forest::new(vec![item("A", vec![])]);

        assert!(forest.update_field("A", "estimate", serde_json::json!(5)));
        assert!(forest.set_title("A", "Renamed"));
        assert!(!forest.update_field("gone", "estimate", serde_json::json!(1)));

        let node = forest.node("A").unwrap();
        assert_eq!(node.title, "Renamed");
        assert_eq!(node.fields.get("estimate"), Some(&serde_json::json!(5)));
    }

    #[test]
    fn group_ids_are_unique() {
        let a = next_group_id();
        let b = next_group_id();
        assert_ne!(a, b);
        assert!(a.starts_with("group-"));
    }
}
