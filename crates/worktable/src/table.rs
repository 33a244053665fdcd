use std::{ops::Range, rc::Rc};

use gpui::{
    App, AppContext as _, Context, CursorStyle, ElementId, Entity, EntityId, FocusHandle, Hsla,
    InteractiveElement as _, IntoElement, ListSizingBehavior, ParentElement as _, Pixels, Point,
    Render, RenderOnce, ScrollStrategy, SharedString, Size, StatefulInteractiveElement as _,
    StyleRefinement, Styled, Window, div, prelude::FluentBuilder as _, px, size,
};
use gpui_component::list::ListItem;
use gpui_component::scroll::{Scrollbar, ScrollbarState};
use gpui_component::{ActiveTheme as _, StyledExt as _, VirtualListScrollHandle, v_virtual_list};
use worktable_core::{
    DragState, DropIntent, DropZones, ExpansionState, Forest, NodeId, RowLayout, RowRect,
    VisibleRow, classify_drop, flatten, subtree_contains,
};

const CONTEXT: &str = "WorkTable";
const DEFAULT_ROW_HEIGHT: Pixels = px(45.);

/// Create a [`WorkTable`].
pub fn work_table<R>(state: &Entity<WorkTableState>, render_item: R) -> WorkTable
where
    R: Fn(usize, &VisibleRow, WorkTableRowState, &mut Window, &mut App) -> ListItem + 'static,
{
    WorkTable::new(state, render_item)
}

#[derive(Clone)]
struct WorkTableDrag {
    table_id: EntityId,
    item_id: SharedString,
    label: SharedString,
}

struct DragGhost {
    label: SharedString,
}

impl DragGhost {
    fn new(label: SharedString) -> Self {
        Self { label }
    }
}

impl Render for DragGhost {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        let theme = cx.theme();
        div()
            .px(px(10.))
            .py(px(6.))
            .rounded(px(8.))
            .bg(theme.popover)
            .border_1()
            .border_color(theme.border)
            .shadow_md()
            .text_color(theme.popover_foreground)
            .text_sm()
            .child(self.label.clone())
    }
}

/// Per-row flags handed to the render callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkTableRowState {
    pub selected: bool,
    pub dragging: bool,
    /// False for leaves and collapsed nodes alike.
    pub expanded: bool,
    /// Set while this row is the hover target of an active drag.
    pub drop_intent: Option<DropIntent>,
}

/// A group-classified drop waiting for the host's confirmation UI. The
/// forest is untouched until [`WorkTableState::confirm_pending_group`]; any
/// other resolution (cancel, a new drag, a reload) discards it.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingGroup {
    pub dragged_id: NodeId,
    pub target_id: NodeId,
}

/// State for the virtualized work-item table: the forest, its flattened
/// projection, and the in-flight drag.
pub struct WorkTableState {
    focus_handle: FocusHandle,
    forest: Forest,
    expansion: ExpansionState,
    rows: Vec<VisibleRow>,
    row_sizes: Rc<Vec<Size<Pixels>>>,
    layout: RowLayout,
    row_height: Pixels,
    indent_width: Pixels,
    indent_offset: Pixels,
    indicator_color: Option<Hsla>,
    drop_zones: DropZones,
    scrollbar_state: ScrollbarState,
    scroll_handle: VirtualListScrollHandle,
    selected_ix: Option<usize>,
    drag: Option<DragState>,
    drag_start_mouse_position: Option<Point<Pixels>>,
    drag_start_rect: Option<RowRect>,
    pending_group: Option<PendingGroup>,
    render_item:
        Rc<dyn Fn(usize, &VisibleRow, WorkTableRowState, &mut Window, &mut App) -> ListItem>,
}

impl WorkTableState {
    pub fn new(cx: &mut App) -> Self {
        Self {
            focus_handle: cx.focus_handle(),
            forest: Forest::default(),
            expansion: ExpansionState::all_expanded(),
            rows: Vec::new(),
            row_sizes: Rc::new(Vec::new()),
            layout: RowLayout::default(),
            row_height: DEFAULT_ROW_HEIGHT,
            indent_width: px(16.),
            indent_offset: px(12.),
            indicator_color: None,
            drop_zones: DropZones::default(),
            scrollbar_state: ScrollbarState::default(),
            scroll_handle: VirtualListScrollHandle::new(),
            selected_ix: None,
            drag: None,
            drag_start_mouse_position: None,
            drag_start_rect: None,
            pending_group: None,
            render_item: Rc::new(|_, _, _, _, _| ListItem::new("worktable-empty")),
        }
    }

    /// Set the uniform row height used for layout and hit testing.
    ///
    /// This should match the height your row renderer produces.
    pub fn row_height(mut self, row_height: Pixels) -> Self {
        self.row_height = row_height;
        self.rebuild_rows();
        self
    }

    /// Set the indentation width (in pixels) per tree depth.
    ///
    /// This should match the indentation used by your row renderer.
    pub fn indent_width(mut self, indent_width: Pixels) -> Self {
        self.indent_width = indent_width;
        self
    }

    /// Set the left offset for the drop indicator line.
    pub fn indent_offset(mut self, indent_offset: Pixels) -> Self {
        self.indent_offset = indent_offset;
        self
    }

    /// Override the drop indicator line color.
    pub fn indicator_color(mut self, color: Hsla) -> Self {
        self.indicator_color = Some(color);
        self
    }

    /// Override the drop classification zones, e.g.
    /// [`DropZones::reorder_only`] for a surface without grouping.
    pub fn drop_zones(mut self, zones: DropZones) -> Self {
        self.drop_zones = zones;
        self
    }

    pub fn forest(mut self, forest: Forest) -> Self {
        self.forest = forest;
        self.forest.recalculate_orders();
        self.rebuild_rows();
        self
    }

    pub fn set_forest(&mut self, forest: Forest, cx: &mut Context<Self>) {
        self.forest = forest;
        self.forest.recalculate_orders();
        self.selected_ix = None;
        self.pending_group = None;
        self.clear_drag_tracking();
        self.rebuild_rows();
        cx.notify();
    }

    pub fn forest_ref(&self) -> &Forest {
        &self.forest
    }

    pub fn rows(&self) -> &[VisibleRow] {
        &self.rows
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_ix
    }

    pub fn set_selected_index(&mut self, ix: Option<usize>, cx: &mut Context<Self>) {
        self.selected_ix = ix.filter(|ix| *ix < self.rows.len());
        cx.notify();
    }

    pub fn selected_row(&self) -> Option<&VisibleRow> {
        self.selected_ix.and_then(|ix| self.rows.get(ix))
    }

    pub fn pending_group(&self) -> Option<&PendingGroup> {
        self.pending_group.as_ref()
    }

    /// Serialize the current forest for the host's persistence collaborator.
    pub fn forest_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.forest)
    }

    /// Replace the forest from a stored snapshot.
    pub fn load_forest_json(&mut self, json: &str, cx: &mut Context<Self>) -> serde_json::Result<()> {
        let forest: Forest = serde_json::from_str(json)?;
        self.set_forest(forest, cx);
        Ok(())
    }

    pub fn toggle_expand(&mut self, id: &str, cx: &mut Context<Self>) {
        if self.forest.node(id).is_none_or(|node| node.is_leaf()) {
            return;
        }
        self.expansion.toggle(id);
        self.rebuild_rows();
        cx.notify();
    }

    pub fn edit_field(
        &mut self,
        id: &str,
        field: &str,
        value: serde_json::Value,
        cx: &mut Context<Self>,
    ) {
        if self.forest.update_field(id, field, value) {
            self.rebuild_rows();
            cx.notify();
        }
    }

    pub fn rename(&mut self, id: &str, title: impl Into<String>, cx: &mut Context<Self>) {
        if self.forest.set_title(id, title) {
            self.rebuild_rows();
            cx.notify();
        }
    }

    /// Commit a parked group gesture with the confirmed title. Returns the
    /// new group's id, or `None` when the gesture no longer applies (stale
    /// ids, blank title).
    pub fn confirm_pending_group(
        &mut self,
        title: impl Into<String>,
        cx: &mut Context<Self>,
    ) -> Option<NodeId> {
        let pending = self.pending_group.take()?;
        let title = title.into();
        let group_id = self
            .forest
            .group(&pending.dragged_id, &pending.target_id, title.trim());
        if let Some(group_id) = group_id.as_ref() {
            // The new group starts expanded so both members stay visible.
            self.expansion.set_expanded(group_id.clone(), true);
            self.rebuild_rows();
            self.selected_ix = self.row_index(group_id);
        }
        cx.notify();
        group_id
    }

    pub fn cancel_pending_group(&mut self, cx: &mut Context<Self>) {
        if self.pending_group.take().is_some() {
            cx.notify();
        }
    }

    fn rebuild_rows(&mut self) {
        self.rows = flatten(&self.forest, &self.expansion);
        let row_height: f32 = self.row_height.into();
        self.layout = RowLayout::uniform(self.rows.len(), row_height);
        self.row_sizes = Rc::new(vec![size(px(0.), self.row_height); self.rows.len()]);
        self.selected_ix = self.selected_ix.filter(|ix| *ix < self.rows.len());
    }

    fn row_index(&self, id: &str) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    fn clear_drag_tracking(&mut self) {
        self.drag = None;
        self.drag_start_mouse_position = None;
        self.drag_start_rect = None;
    }

    fn on_key_down(&mut self, event: &gpui::KeyDownEvent, cx: &mut Context<Self>) -> bool {
        if cx.has_active_drag() {
            return false;
        }

        if self.rows.is_empty() {
            return false;
        }

        let mut selected_ix = self.selected_ix.unwrap_or(0).min(self.rows.len() - 1);

        let select = |this: &mut Self, ix: usize, cx: &mut Context<Self>| {
            let ix = ix.min(this.rows.len().saturating_sub(1));
            this.selected_ix = Some(ix);
            this.scroll_handle
                .scroll_to_item(ix, ScrollStrategy::Center);
            cx.notify();
        };

        match event.keystroke.key.as_str() {
            "up" => {
                if selected_ix > 0 {
                    selected_ix -= 1;
                }
                select(self, selected_ix, cx);
                true
            }
            "down" => {
                if selected_ix + 1 < self.rows.len() {
                    selected_ix += 1;
                }
                select(self, selected_ix, cx);
                true
            }
            "home" => {
                select(self, 0, cx);
                true
            }
            "end" => {
                select(self, self.rows.len().saturating_sub(1), cx);
                true
            }
            "right" => {
                let Some(row) = self.rows.get(selected_ix) else {
                    return false;
                };
                if row.item.is_leaf() {
                    return false;
                }

                let row_id = row.item.id.clone();
                if !self.expansion.is_expanded(&row_id) {
                    self.expansion.set_expanded(row_id.clone(), true);
                    self.rebuild_rows();
                    if let Some(ix) = self.row_index(&row_id) {
                        select(self, ix, cx);
                    } else {
                        cx.notify();
                    }
                    return true;
                }

                // Already expanded: step into the first child.
                let child_ix = selected_ix.saturating_add(1);
                if self
                    .rows
                    .get(child_ix)
                    .is_some_and(|child| child.depth == row.depth + 1)
                {
                    select(self, child_ix, cx);
                }
                true
            }
            "left" => {
                let Some(row) = self.rows.get(selected_ix) else {
                    return false;
                };

                if !row.item.is_leaf() && self.expansion.is_expanded(row.id()) {
                    let row_id = row.item.id.clone();
                    self.expansion.set_expanded(row_id.clone(), false);
                    self.rebuild_rows();
                    if let Some(ix) = self.row_index(&row_id) {
                        select(self, ix, cx);
                    } else {
                        cx.notify();
                    }
                    return true;
                }

                if let Some(parent_id) = row.parent_id().cloned()
                    && let Some(parent_ix) = self.row_index(&parent_id)
                {
                    select(self, parent_ix, cx);
                    return true;
                }

                false
            }
            "enter" | "space" => {
                let Some(row) = self.rows.get(selected_ix) else {
                    return false;
                };
                if row.item.is_leaf() {
                    return false;
                }

                let row_id = row.item.id.clone();
                self.expansion.toggle(&row_id);
                self.rebuild_rows();
                self.selected_ix = self.row_index(&row_id);
                if let Some(ix) = self.selected_ix {
                    self.scroll_handle
                        .scroll_to_item(ix, ScrollStrategy::Center);
                }
                cx.notify();
                true
            }
            _ => false,
        }
    }

    fn on_row_click(&mut self, ix: usize, cx: &mut Context<Self>) {
        self.selected_ix = Some(ix).filter(|ix| *ix < self.rows.len());
        if let Some(row) = self.rows.get(ix) {
            let row_id = row.item.id.clone();
            if !row.item.is_leaf() {
                self.expansion.toggle(&row_id);
                self.rebuild_rows();
                self.selected_ix = self.row_index(&row_id);
            }
        }
        cx.notify();
    }

    fn on_drag_start(&mut self, drag: &WorkTableDrag, window: &mut Window, cx: &mut Context<Self>) {
        let ix = self.row_index(&drag.item_id);
        self.drag = Some(DragState::new(drag.item_id.to_string()));
        self.drag_start_mouse_position = Some(window.mouse_position());
        self.drag_start_rect =
            ix.map(|ix| RowRect::new(self.layout.origin(ix), self.layout.height(ix)));
        self.pending_group = None;
        self.selected_ix = ix;
        cx.notify();
    }

    fn on_drag_move(
        &mut self,
        event: &gpui::DragMoveEvent<WorkTableDrag>,
        _window: &mut Window,
        cx: &mut Context<Self>,
    ) {
        if !cx.has_active_drag() {
            return;
        }

        let mouse_position = event.event.position;
        let list_bounds = event.bounds;
        let drag_value = event.drag(cx);

        let before = self.drag.clone();
        let Some(drag) = self.drag.as_mut() else {
            return;
        };

        if drag_value.table_id != cx.entity_id() || !list_bounds.contains(&mouse_position) {
            drag.leave();
            if self.drag != before {
                cx.notify();
            }
            return;
        }

        let delta_y: f32 = self
            .drag_start_mouse_position
            .map(|start| mouse_position.y - start.y)
            .unwrap_or(Pixels::ZERO)
            .into();
        let scroll_y = self.scroll_handle.offset().y;
        let y_in_content: f32 = (mouse_position.y - list_bounds.origin.y - scroll_y).into();

        match classify_in_content_space(
            &self.layout,
            self.drag_start_rect,
            delta_y,
            y_in_content,
            self.drop_zones,
        ) {
            Some((hovered_ix, intent)) => {
                let over_id = self.rows[hovered_ix].item.id.clone();
                drag.drag_over(over_id, intent);
            }
            None => drag.leave(),
        }

        if self.drag != before {
            cx.notify();
        }
    }

    fn on_drop(&mut self, drag: &WorkTableDrag, cx: &mut Context<Self>) {
        if drag.table_id != cx.entity_id() {
            self.clear_drag_tracking();
            cx.notify();
            return;
        }

        let Some(state) = self.drag.take() else {
            return;
        };
        self.clear_drag_tracking();

        let (Some(over_id), Some(intent)) = (state.over_id, state.intent) else {
            cx.notify();
            return;
        };

        match intent {
            DropIntent::Group => {
                // Park the gesture for confirmation, unless it is already
                // structurally doomed (target inside the dragged subtree).
                let valid = self
                    .forest
                    .node(&state.dragged_id)
                    .is_some_and(|node| !subtree_contains(node, &over_id));
                if valid {
                    self.pending_group = Some(PendingGroup {
                        dragged_id: state.dragged_id,
                        target_id: over_id,
                    });
                }
            }
            DropIntent::ReorderAbove | DropIntent::ReorderBelow => {
                if self.forest.reorder(&state.dragged_id, &over_id, intent) {
                    self.rebuild_rows();
                    self.selected_ix = self.row_index(&state.dragged_id);
                }
            }
        }
        cx.notify();
    }
}

impl Render for WorkTableState {
    fn render(&mut self, _window: &mut Window, cx: &mut Context<Self>) -> impl IntoElement {
        if !cx.has_active_drag() {
            self.clear_drag_tracking();
        }

        let render_item = Rc::clone(&self.render_item);
        let state_entity = cx.entity();
        let drag = self.drag.clone();
        let row_sizes = self.row_sizes.clone();
        let scroll_handle = self.scroll_handle.clone();
        let scroll_y = self.scroll_handle.offset().y;

        // Indicator line for the reorder intents; the group intent highlights
        // the target row instead.
        let line = drag
            .as_ref()
            .and_then(|drag| {
                let over_id = drag.over_id.as_ref()?;
                let intent = drag.intent?;
                let ix = self.row_index(over_id)?;
                let y = match intent {
                    DropIntent::ReorderAbove => self.layout.origin(ix),
                    DropIntent::ReorderBelow => self.layout.origin(ix) + self.layout.height(ix),
                    DropIntent::Group => return None,
                };
                let depth = self.rows.get(ix).map(|row| row.depth).unwrap_or(0);
                Some((px(y) + scroll_y, self.indent_offset + self.indent_width * depth))
            })
            .map(|(y, x)| {
                let theme = cx.theme();
                let color = self.indicator_color.unwrap_or(theme.foreground);
                div()
                    .absolute()
                    .left(x)
                    .right_0()
                    .top(y)
                    .h(px(2.))
                    .bg(color)
                    .child(
                        div()
                            .absolute()
                            .left(px(-1.))
                            .top(px(-4.))
                            .w(px(2.))
                            .h(px(10.))
                            .bg(color),
                    )
            });

        div()
            .id("worktable-state")
            .size_full()
            .relative()
            .child(
                div()
                    .id("worktable-list")
                    .size_full()
                    .on_drag_move::<WorkTableDrag>(cx.listener(Self::on_drag_move))
                    .on_drop::<WorkTableDrag>(cx.listener(|this, drag, _window, cx| {
                        this.on_drop(drag, cx);
                    }))
                    .child(
                        v_virtual_list(
                            cx.entity(),
                            "rows",
                            row_sizes,
                            move |state, visible_range: Range<usize>, window, cx| {
                                let drop_target_bg = cx.theme().drop_target;
                                let mut items = Vec::with_capacity(visible_range.len());
                                for ix in visible_range {
                                    let row = &state.rows[ix];
                                    let selected = Some(ix) == state.selected_ix;
                                    let dragging = drag
                                        .as_ref()
                                        .is_some_and(|drag| drag.dragged_id == row.item.id)
                                        && cx.has_active_drag();
                                    let drop_intent = drag
                                        .as_ref()
                                        .filter(|drag| drag.is_over(row.id()))
                                        .and_then(|drag| drag.intent);

                                    let expanded = !row.item.is_leaf()
                                        && state.expansion.is_expanded(row.id());

                                    let row_state = WorkTableRowState {
                                        selected,
                                        dragging,
                                        expanded,
                                        drop_intent,
                                    };

                                    let item = (render_item)(ix, row, row_state, window, cx);
                                    let drag_value = WorkTableDrag {
                                        table_id: cx.entity_id(),
                                        item_id: SharedString::from(row.item.id.clone()),
                                        label: SharedString::from(row.item.title.clone()),
                                    };

                                    let state_entity = state_entity.clone();
                                    let grouping = drop_intent == Some(DropIntent::Group);
                                    let element = div()
                                        .id(ix)
                                        .relative()
                                        .size_full()
                                        .flex()
                                        .flex_row()
                                        .cursor(CursorStyle::OpenHand)
                                        .when(grouping, |this| this.bg(drop_target_bg))
                                        .child(item.selected(selected).h_full().flex_1())
                                        .on_drop::<WorkTableDrag>(cx.listener(
                                            |this, drag, _window, cx| {
                                                this.on_drop(drag, cx);
                                            },
                                        ))
                                        .on_click(cx.listener(move |this, _event, _window, cx| {
                                            this.on_row_click(ix, cx);
                                        }))
                                        .on_drag(
                                            drag_value,
                                            move |drag, _cursor_offset, window, cx: &mut App| {
                                                state_entity.update(cx, |state, cx| {
                                                    state.on_drag_start(drag, window, cx);
                                                });
                                                let label = drag.label.clone();
                                                cx.new(|_| DragGhost::new(label))
                                            },
                                        );

                                    items.push(element);
                                }
                                items
                            },
                        )
                        .track_scroll(&scroll_handle)
                        .flex_grow()
                        .size_full()
                        .with_sizing_behavior(ListSizingBehavior::Auto)
                        .into_any_element(),
                    ),
            )
            .child(
                div()
                    .absolute()
                    .top_0()
                    .right_0()
                    .bottom_0()
                    .w(px(12.))
                    .child(Scrollbar::uniform_scroll(
                        &self.scrollbar_state,
                        &self.scroll_handle,
                    )),
            )
            .when_some(line, |this, line| this.child(line))
    }
}

/// A virtualized, draggable tree-table element over a work-item forest.
#[derive(IntoElement)]
pub struct WorkTable {
    id: ElementId,
    state: Entity<WorkTableState>,
    style: StyleRefinement,
    render_item:
        Rc<dyn Fn(usize, &VisibleRow, WorkTableRowState, &mut Window, &mut App) -> ListItem>,
}

impl WorkTable {
    pub fn new<R>(state: &Entity<WorkTableState>, render_item: R) -> Self
    where
        R: Fn(usize, &VisibleRow, WorkTableRowState, &mut Window, &mut App) -> ListItem + 'static,
    {
        Self {
            id: ElementId::Name(format!("worktable-{}", state.entity_id()).into()),
            state: state.clone(),
            style: StyleRefinement::default(),
            render_item: Rc::new(move |ix, row, row_state, window, cx| {
                render_item(ix, row, row_state, window, cx)
            }),
        }
    }
}

impl Styled for WorkTable {
    fn style(&mut self) -> &mut StyleRefinement {
        &mut self.style
    }
}

impl RenderOnce for WorkTable {
    fn render(self, _window: &mut Window, cx: &mut App) -> impl IntoElement {
        let focus_handle = self.state.read(cx).focus_handle.clone();
        let state_entity = self.state.clone();
        self.state
            .update(cx, |state, _| state.render_item = self.render_item);

        div()
            .id(self.id)
            .key_context(CONTEXT)
            .track_focus(&focus_handle)
            .on_key_down(move |event, window, cx| {
                let handled = state_entity.update(cx, |state, cx| state.on_key_down(event, cx));
                if handled {
                    window.prevent_default();
                    cx.stop_propagation();
                }
            })
            .size_full()
            .child(self.state)
            .refine_style(&self.style)
    }
}

/// Hit-test the hovered row and classify the drop, all in content space.
/// The dragged rect is the drag-start rect translated by the pointer's
/// vertical delta. Returns `None` when the pointer is past the last row.
fn classify_in_content_space(
    layout: &RowLayout,
    start_rect: Option<RowRect>,
    delta_y: f32,
    y_in_content: f32,
    zones: DropZones,
) -> Option<(usize, DropIntent)> {
    let hovered_ix = layout.index_at(y_in_content);
    if hovered_ix >= layout.len() {
        return None;
    }
    let target = RowRect::new(layout.origin(hovered_ix), layout.height(hovered_ix));
    let dragged = start_rect.map(|rect| RowRect::new(rect.top + delta_y, rect.height));
    Some((hovered_ix, classify_drop(dragged, Some(target), zones)))
}
