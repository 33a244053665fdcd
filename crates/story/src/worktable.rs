use gpui::prelude::FluentBuilder as _;
use gpui::*;
use gpui_component::ActiveTheme as _;
use gpui_component::button::{Button, ButtonVariants as _};
use gpui_component::list::ListItem;
use gpui_component::{h_flex, v_flex};
use gpui_worktable::{WorkTableRowState, WorkTableState, work_table};
use worktable_core::{DropIntent, Forest, ItemKind, VisibleRow, WorkItem};

pub struct WorkTableExample {
    table: Entity<WorkTableState>,
}

impl WorkTableExample {
    pub fn view(_window: &mut Window, cx: &mut App) -> Entity<Self> {
        let table = cx.new(|cx| {
            WorkTableState::new(cx)
                .row_height(px(36.))
                .indent_width(px(16.))
                .indent_offset(px(10.))
                .forest(seed_forest())
        });
        cx.new(|_| Self { table })
    }
}

impl Render for WorkTableExample {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        let table = self.table.read(cx);
        let tree_dump = format_forest(table.forest_ref());
        let selected = table
            .selected_row()
            .map(|row| format!("{} {}", row.item.order, row.item.title))
            .unwrap_or_else(|| "<none>".to_string());
        let pending = table.pending_group().map(|pending| {
            let title_of = |id: &str| {
                table
                    .forest_ref()
                    .node(id)
                    .map(|node| node.title.clone())
                    .unwrap_or_else(|| id.to_string())
            };
            (title_of(&pending.dragged_id), title_of(&pending.target_id))
        });

        v_flex()
            .size_full()
            .p(px(16.))
            .gap_y_3()
            .child(
                v_flex()
                    .gap_y_1()
                    .child(
                        div()
                            .text_xl()
                            .font_weight(FontWeight::BOLD)
                            .child("WorkTable"),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child(
                                "Drag a row near the top or bottom edge of another row to \
                                 reorder within that level; drop on the middle to group the two.",
                            ),
                    )
                    .child(
                        div()
                            .text_sm()
                            .text_color(theme.muted_foreground)
                            .child(format!("Selected: {selected}")),
                    ),
            )
            .when_some(pending, |this, (dragged, target)| {
                this.child(
                    h_flex()
                        .gap_x_2()
                        .items_center()
                        .p(px(8.))
                        .rounded(px(8.))
                        .border_1()
                        .border_color(theme.border)
                        .child(
                            div()
                                .text_sm()
                                .child(format!("Group \"{dragged}\" with \"{target}\"?")),
                        )
                        .child(
                            Button::new("confirm-group")
                                .label("Create group")
                                .ghost()
                                .on_click(cx.listener(move |this, _, _window, cx| {
                                    this.table.update(cx, |table, cx| {
                                        let title = table
                                            .pending_group()
                                            .and_then(|pending| {
                                                table.forest_ref().node(&pending.target_id)
                                            })
                                            .map(|target| format!("Group: {}", target.title))
                                            .unwrap_or_else(|| "New Group".to_string());
                                        table.confirm_pending_group(title, cx);
                                    });
                                })),
                        )
                        .child(
                            Button::new("cancel-group")
                                .label("Cancel")
                                .ghost()
                                .on_click(cx.listener(|this, _, _window, cx| {
                                    this.table.update(cx, |table, cx| {
                                        table.cancel_pending_group(cx);
                                    });
                                })),
                        ),
                )
            })
            .child(
                h_flex()
                    .flex_1()
                    .min_h(px(0.))
                    .gap_x_3()
                    .child(
                        v_flex()
                            .w(px(560.))
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(
                                div()
                                    .text_sm()
                                    .font_weight(FontWeight::MEDIUM)
                                    .child("Backlog"),
                            )
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .child(work_table(
                                        &self.table,
                                        move |ix, row, row_state, _window, cx| {
                                            render_table_row(ix, row, row_state, cx)
                                        },
                                    )),
                            ),
                    )
                    .child(
                        v_flex()
                            .flex_1()
                            .min_w(px(0.))
                            .h_full()
                            .gap_y_2()
                            .child(
                                div()
                                    .text_sm()
                                    .font_weight(FontWeight::MEDIUM)
                                    .child("Forest"),
                            )
                            .child(
                                div()
                                    .flex_1()
                                    .min_h(px(0.))
                                    .rounded(px(12.))
                                    .border_1()
                                    .border_color(theme.border)
                                    .bg(theme.background)
                                    .p(px(12.))
                                    .child(render_forest_dump(tree_dump)),
                            ),
                    ),
            )
    }
}

fn render_table_row(
    ix: usize,
    row: &VisibleRow,
    row_state: WorkTableRowState,
    cx: &mut App,
) -> ListItem {
    let theme = cx.theme();
    let indent = px(16.) * row.depth;
    let marker = if row.item.is_leaf() {
        "  "
    } else if row_state.expanded {
        "▾ "
    } else {
        "▸ "
    };
    let kind_color = match row.item.kind {
        ItemKind::Group => theme.primary,
        _ => theme.muted_foreground,
    };
    let grouping = row_state.drop_intent == Some(DropIntent::Group);

    let left = h_flex()
        .gap_x_2()
        .items_center()
        .child(
            div()
                .text_xs()
                .text_color(theme.muted_foreground)
                .w(px(48.))
                .child(row.item.order.clone()),
        )
        .child(div().text_sm().child(format!("{marker}{}", row.item.title)));
    let right = div()
        .text_xs()
        .text_color(kind_color)
        .child(row.item.kind.label());

    ListItem::new(ix)
        .pl(px(10.) + indent)
        .when(row_state.dragging, |this| this.opacity(0.4))
        .when(grouping, |this| this.font_weight(FontWeight::MEDIUM))
        .child(
            h_flex()
                .w_full()
                .items_center()
                .justify_between()
                .child(left)
                .child(right),
        )
}

fn render_forest_dump(text: String) -> impl IntoElement {
    let lines = text
        .lines()
        .map(|line| div().text_sm().child(line.to_string()));
    v_flex().gap_y_0p5().children(lines)
}

fn format_forest(forest: &Forest) -> String {
    fn walk(items: &[WorkItem], depth: usize, out: &mut String) {
        for item in items {
            out.push_str(&"  ".repeat(depth));
            out.push_str(&item.order);
            out.push(' ');
            out.push_str(&item.title);
            out.push('\n');
            walk(&item.children, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(&forest.items, 0, &mut out);
    out
}

fn seed_forest() -> Forest {
    Forest::new(vec![
        WorkItem::new("root-1", ItemKind::Epic, "Root Project Alpha").children(vec![
            WorkItem::new("feat-1", ItemKind::Feature, "Core Functionality").children(vec![
                WorkItem::new("pbi-1", ItemKind::Item, "User Authentication Flow"),
                WorkItem::new("pbi-2", ItemKind::Item, "Dashboard Analytics").children(vec![
                    WorkItem::new("task-1", ItemKind::Task, "Design database schema"),
                    WorkItem::new("task-2", ItemKind::Task, "Implement API endpoints"),
                ]),
            ]),
            WorkItem::new("feat-2", ItemKind::Feature, "Reporting Module")
                .child(WorkItem::new("pbi-3", ItemKind::Item, "Export to PDF")),
        ]),
        WorkItem::new("root-2", ItemKind::Epic, "Secondary Initiatives").child(
            WorkItem::new("feat-3", ItemKind::Feature, "Mobile Responsiveness")
                .child(WorkItem::new("task-3", ItemKind::Task, "Fix layout on iPhone SE")),
        ),
    ])
}
