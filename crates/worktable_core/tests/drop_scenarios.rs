use worktable_core::{
    AutoConfirm, DropIntent, DropOutcome, DropZones, ExpansionState, Forest, GroupPrompt,
    ItemKind, RowRect, WorkItem, classify_drop, flatten,
};

fn item(id: &str, title: &str) -> WorkItem {
    WorkItem::new(id, ItemKind::Item, title)
}

fn dump(items: &[WorkItem], depth: usize, out: &mut String) {
    for node in items {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.id);
        out.push('\n');
        dump(&node.children, depth + 1, out);
    }
}

fn tree(forest: &Forest) -> String {
    let mut s = String::new();
    dump(&forest.items, 0, &mut s);
    s.trim().to_string()
}

#[test]
fn group_drop_wraps_target_and_dragged() {
    // Forest [A, B], B has children [B1, B2]. Drag A onto B1 with the group
    // intent: B1 is replaced in B's children by Group[B1, A].
    let mut forest = Forest::new(vec![
        item("A", "Alpha"),
        item("B", "Beta").children(vec![item("B1", "Beta one"), item("B2", "Beta two")]),
    ]);

    let outcome = forest.apply_drop("A", "B1", DropIntent::Group, &mut AutoConfirm("G1".into()));
    let DropOutcome::Grouped(group_id) = outcome else {
        panic!("expected group, got {outcome:?}");
    };

    assert_eq!(
        tree(&forest),
        format!(
            r#"B
  {group_id}
    B1
    A
  B2"#
        )
    );

    assert_eq!(forest.node("B").unwrap().order, "1");
    assert_eq!(forest.node(&group_id).unwrap().order, "1.1");
    assert_eq!(forest.node("B1").unwrap().order, "1.1.1");
    assert_eq!(forest.node("A").unwrap().order, "1.1.2");
    assert_eq!(forest.node("B2").unwrap().order, "1.2");
    assert_eq!(forest.node(&group_id).unwrap().title, "G1");
}

#[test]
fn reorder_above_from_classified_geometry() {
    // Forest [A, B, C]; drag C over A with its center in the top tenth of
    // A's bounds.
    let mut forest = Forest::new(vec![item("A", "a"), item("B", "b"), item("C", "c")]);

    let target = RowRect::new(0.0, 40.0);
    let dragged = RowRect::new(40.0 * 0.1 - 20.0, 40.0);
    let intent = classify_drop(Some(dragged), Some(target), DropZones::default());
    assert_eq!(intent, DropIntent::ReorderAbove);

    let outcome = forest.apply_drop("C", "A", intent, &mut AutoConfirm("unused".into()));
    assert_eq!(outcome, DropOutcome::Reordered);

    assert_eq!(
        tree(&forest),
        r#"C
A
B"#
    );
    let orders: Vec<_> = forest.items.iter().map(|n| n.order.clone()).collect();
    assert_eq!(orders, vec!["1", "2", "3"]);
}

#[test]
fn drop_onto_own_descendant_is_rejected() {
    let mut forest = Forest::new(vec![
        item("A", "a").children(vec![item("B", "b").children(vec![item("C", "c")])]),
        item("D", "d"),
    ]);
    let before = forest.clone();

    for intent in [
        DropIntent::ReorderAbove,
        DropIntent::ReorderBelow,
        DropIntent::Group,
    ] {
        let outcome = forest.apply_drop("A", "C", intent, &mut AutoConfirm("G".into()));
        assert_eq!(outcome, DropOutcome::Ignored, "intent {intent:?}");
        assert_eq!(forest, before, "intent {intent:?}");
    }
}

#[test]
fn decline_and_empty_title_both_abort_grouping() {
    struct EmptyTitle;
    impl GroupPrompt for EmptyTitle {
        fn confirm_group(&mut self, _: &WorkItem, _: &WorkItem) -> Option<String> {
            Some("  ".into())
        }
    }
    struct Decline;
    impl GroupPrompt for Decline {
        fn confirm_group(&mut self, _: &WorkItem, _: &WorkItem) -> Option<String> {
            None
        }
    }

    let mut forest = Forest::new(vec![item("A", "a"), item("B", "b")]);
    let before = forest.clone();

    assert_eq!(
        forest.apply_drop("A", "B", DropIntent::Group, &mut EmptyTitle),
        DropOutcome::Ignored
    );
    assert_eq!(
        forest.apply_drop("A", "B", DropIntent::Group, &mut Decline),
        DropOutcome::Ignored
    );
    assert_eq!(forest, before);
}

#[test]
fn cross_branch_drop_projects_to_common_level() {
    // Dragging a root onto a deep descendant of another root snaps to the
    // root level.
    let mut forest = Forest::new(vec![
        item("A", "a"),
        item("B", "b").children(vec![
            item("B1", "b1").children(vec![item("B1a", "b1a")]),
        ]),
        item("C", "c"),
    ]);

    let outcome = forest.apply_drop(
        "C",
        "B1a",
        DropIntent::ReorderAbove,
        &mut AutoConfirm("unused".into()),
    );
    assert_eq!(outcome, DropOutcome::Reordered);

    assert_eq!(
        tree(&forest),
        r#"A
C
B
  B1
    B1a"#
    );
}

#[test]
fn flattened_rows_track_drops() {
    let mut forest = Forest::new(vec![
        item("A", "a"),
        item("B", "b").children(vec![item("B1", "b1"), item("B2", "b2")]),
    ]);
    let expansion = ExpansionState::all_expanded();

    let ids = |forest: &Forest| -> Vec<String> {
        flatten(forest, &expansion)
            .iter()
            .map(|row| row.id().to_string())
            .collect()
    };
    assert_eq!(ids(&forest), vec!["A", "B", "B1", "B2"]);

    forest.apply_drop(
        "B2",
        "B1",
        DropIntent::ReorderAbove,
        &mut AutoConfirm("unused".into()),
    );
    assert_eq!(ids(&forest), vec!["A", "B", "B2", "B1"]);
}
