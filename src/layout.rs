//! Auto-layout solving for container shapes: stack flow and grid flow, with
//! per-axis fixed/hug/fill sizing, alignment, spacing, and padding.
//!
//! The solver only repositions children flagged as auto-positioned and is
//! idempotent: every write is guarded by an epsilon-tolerant equality check,
//! since it reruns after nearly every structural child mutation.

use tracing::trace;

use crate::document::{
    Axis, CrossAlign, Document, LayoutFlow, MainAlign, Shape, ShapeKind, SizingMode,
};
use crate::geometry;
use crate::scene;

pub const LAYOUT_EPSILON: f32 = 1e-3;

/// Solves every auto-layout container in the document, children before
/// parents so hug sizes propagate upward.
pub fn solve_all(doc: &mut Document) {
    let order = containers_post_order(doc);
    for id in order {
        solve_container(doc, &id);
    }
}

/// Re-solves from `shape_id`'s nearest auto-layout ancestor, then
/// recursively upward while that ancestor's own parent is also auto-layout.
pub fn resolve_layout_upward(doc: &mut Document, shape_id: &str) {
    let Some(mut current) = nearest_auto_ancestor(doc, shape_id) else {
        return;
    };
    solve_subtree(doc, &current);
    loop {
        let parent = doc
            .shape(&current)
            .and_then(|s| s.parent_id.clone())
            .filter(|p| doc.shape(p).map(|s| s.layout.is_some()).unwrap_or(false));
        match parent {
            Some(p) => {
                solve_container(doc, &p);
                current = p;
            }
            None => break,
        }
    }
}

/// Runs one solver pass over a single container. A no-op for shapes without
/// `layout = auto`.
pub fn solve_container(doc: &mut Document, container_id: &str) {
    let Some(container) = doc.shape(container_id) else {
        return;
    };
    let Some(layout) = container.layout else {
        return;
    };
    match layout.flow {
        LayoutFlow::Stack => solve_stack(doc, container_id),
        LayoutFlow::Grid => solve_grid(doc, container_id),
    }
}

fn solve_subtree(doc: &mut Document, root: &str) {
    let mut order: Vec<String> = scene::descendants_of(doc, root)
        .into_iter()
        .filter(|id| doc.shape(id).map(is_auto_container).unwrap_or(false))
        .collect();
    order.reverse();
    for id in order {
        solve_container(doc, &id);
    }
    solve_container(doc, root);
}

fn is_auto_container(shape: &Shape) -> bool {
    shape.is_container() && shape.layout.is_some()
}

fn nearest_auto_ancestor(doc: &Document, shape_id: &str) -> Option<String> {
    let mut current = shape_id.to_string();
    // A container re-solves itself; other shapes resolve to an ancestor.
    if doc.shape(&current).map(is_auto_container).unwrap_or(false) {
        return Some(current);
    }
    loop {
        let parent = doc.shape(&current)?.parent_id.clone()?;
        if doc.shape(&parent).map(is_auto_container).unwrap_or(false) {
            return Some(parent);
        }
        current = parent;
    }
}

/// Deepest-first ordering of all auto-layout containers.
fn containers_post_order(doc: &Document) -> Vec<String> {
    let mut with_depth: Vec<(usize, String)> = doc
        .shapes
        .iter()
        .filter(|s| is_auto_container(s))
        .map(|s| (depth_of(doc, &s.id), s.id.clone()))
        .collect();
    with_depth.sort_by(|a, b| b.0.cmp(&a.0));
    with_depth.into_iter().map(|(_, id)| id).collect()
}

fn depth_of(doc: &Document, id: &str) -> usize {
    let mut depth = 0;
    let mut current = id.to_string();
    while let Some(parent) = doc.shape(&current).and_then(|s| s.parent_id.clone()) {
        if doc.shape(&parent).is_none() {
            break;
        }
        depth += 1;
        current = parent;
    }
    depth
}

fn main_of(axis: Axis, w: f32, h: f32) -> f32 {
    match axis {
        Axis::Horizontal => w,
        Axis::Vertical => h,
    }
}

fn cross_of(axis: Axis, w: f32, h: f32) -> f32 {
    match axis {
        Axis::Horizontal => h,
        Axis::Vertical => w,
    }
}

fn sizing_along(shape: &Shape, horizontal: bool) -> SizingMode {
    match shape.layout {
        Some(l) => {
            if horizontal {
                l.width_mode
            } else {
                l.height_mode
            }
        }
        None => SizingMode::Fixed,
    }
}

fn main_sizing(shape: &Shape, axis: Axis) -> SizingMode {
    sizing_along(shape, axis == Axis::Horizontal)
}

fn cross_sizing(shape: &Shape, axis: Axis) -> SizingMode {
    sizing_along(shape, axis != Axis::Horizontal)
}

fn write_guarded(target: &mut f32, value: f32) -> bool {
    if (*target - value).abs() > LAYOUT_EPSILON {
        *target = value;
        true
    } else {
        false
    }
}

/// Writes a shape's extent along one document axis, respecting the shape's
/// own geometry representation.
fn set_extent(shape: &mut Shape, horizontal: bool, size: f32) {
    match shape.kind {
        ShapeKind::Frame | ShapeKind::Group | ShapeKind::Rectangle | ShapeKind::Text => {
            let field = if horizontal { &mut shape.width } else { &mut shape.height };
            let mut current = field.unwrap_or(0.0);
            if write_guarded(&mut current, size) {
                *field = Some(current);
            }
        }
        ShapeKind::Circle => {
            let mut r = shape.radius.unwrap_or(0.0);
            if write_guarded(&mut r, size / 2.0) {
                shape.radius = Some(r);
            }
        }
        ShapeKind::Ellipse => {
            let field = if horizontal { &mut shape.radius_x } else { &mut shape.radius_y };
            let mut current = field.unwrap_or(0.0);
            if write_guarded(&mut current, size / 2.0) {
                *field = Some(current);
            }
        }
        // Point-derived shapes keep their geometry; fill sizing skips them.
        ShapeKind::Polygon | ShapeKind::RoundedPolygon | ShapeKind::Line | ShapeKind::Path => {}
    }
}

fn set_center_along(shape: &mut Shape, horizontal: bool, value: f32) {
    if horizontal {
        write_guarded(&mut shape.x, value);
    } else {
        write_guarded(&mut shape.y, value);
    }
}

fn solve_stack(doc: &mut Document, container_id: &str) {
    let container = doc.shape(container_id).expect("container exists");
    let layout = container.layout.expect("auto layout present");
    let axis = layout.axis;
    let horizontal = axis == Axis::Horizontal;

    let child_ids: Vec<String> = scene::children_of(doc, Some(container_id))
        .into_iter()
        .filter(|id| doc.shape(id).map(|s| s.auto_positioned).unwrap_or(false))
        .collect();

    let (cw, ch) = geometry::dimensions(container);
    let container_center = (container.x, container.y);
    let n = child_ids.len();
    let gaps = if n > 1 { layout.spacing * (n - 1) as f32 } else { 0.0 };

    let container_hugs_main = main_sizing(container, axis) == SizingMode::Hug;
    let container_hugs_cross = cross_sizing(container, axis) == SizingMode::Hug;

    // Pass 1: intrinsic sizes; fill children resolved against remaining
    // space, or treated as hug when the container itself hugs the axis.
    let mut intrinsic: Vec<(f32, f32, bool)> = Vec::with_capacity(n);
    let mut fixed_sum = 0.0;
    let mut fill_count = 0usize;
    for id in &child_ids {
        let child = doc.shape(id).expect("child exists");
        let (w, h) = geometry::dimensions(child);
        let fills_main = main_sizing(child, axis) == SizingMode::Fill && !container_hugs_main;
        if fills_main {
            fill_count += 1;
        } else {
            fixed_sum += main_of(axis, w, h);
        }
        intrinsic.push((w, h, fills_main));
    }

    let main_size = if container_hugs_main {
        fixed_sum + gaps + layout.padding * 2.0
    } else {
        main_of(axis, cw, ch)
    };
    let inner_main = main_size - layout.padding * 2.0;

    let cross_size = if container_hugs_cross {
        let max_cross = intrinsic
            .iter()
            .map(|(w, h, _)| cross_of(axis, *w, *h))
            .fold(0.0_f32, f32::max);
        max_cross + layout.padding * 2.0
    } else {
        cross_of(axis, cw, ch)
    };
    let inner_cross = cross_size - layout.padding * 2.0;

    let fill_share = if fill_count > 0 {
        ((inner_main - fixed_sum - gaps) / fill_count as f32).max(0.0)
    } else {
        0.0
    };

    // Final main sizes and the slack distributed by main alignment.
    let final_main: Vec<f32> = intrinsic
        .iter()
        .map(|(w, h, fills)| if *fills { fill_share } else { main_of(axis, *w, *h) })
        .collect();
    let used: f32 = final_main.iter().sum::<f32>() + gaps;
    let slack = (inner_main - used).max(0.0);
    let (lead, extra_gap) = match layout.main_align {
        MainAlign::Start => (0.0, 0.0),
        MainAlign::Center => (slack / 2.0, 0.0),
        MainAlign::End => (slack, 0.0),
        MainAlign::SpaceBetween => {
            if n > 1 {
                (0.0, slack / (n - 1) as f32)
            } else {
                (slack / 2.0, 0.0)
            }
        }
    };

    let main_edge = main_of(axis, container_center.0, container_center.1) - main_size / 2.0;
    let cross_edge = cross_of(axis, container_center.0, container_center.1) - cross_size / 2.0;

    // Write container hug sizes.
    {
        let container = doc.shape_mut(container_id).expect("container exists");
        if container_hugs_main {
            set_extent(container, horizontal, main_size);
        }
        if container_hugs_cross {
            set_extent(container, !horizontal, cross_size);
        }
    }

    // Pass 2: placement.
    let mut cursor = main_edge + layout.padding + lead;
    for (i, id) in child_ids.iter().enumerate() {
        let (w, h, fills_main) = intrinsic[i];
        let main = final_main[i];
        let stretches = layout.cross_align == CrossAlign::Stretch
            || (cross_sizing(doc.shape(id).expect("child exists"), axis) == SizingMode::Fill
                && !container_hugs_cross);
        let cross = if stretches { inner_cross } else { cross_of(axis, w, h) };

        let cross_center = match layout.cross_align {
            CrossAlign::Start | CrossAlign::Stretch => cross_edge + layout.padding + cross / 2.0,
            CrossAlign::Center => cross_edge + cross_size / 2.0,
            CrossAlign::End => cross_edge + cross_size - layout.padding - cross / 2.0,
        };
        let main_center = cursor + main / 2.0;

        let child = doc.shape_mut(id).expect("child exists");
        if fills_main {
            set_extent(child, horizontal, main);
        }
        if stretches {
            set_extent(child, !horizontal, cross);
        }
        set_center_along(child, horizontal, main_center);
        set_center_along(child, !horizontal, cross_center);

        cursor += main + layout.spacing + extra_gap;
    }
    trace!(container = container_id, children = n, "stack layout solved");
}

fn solve_grid(doc: &mut Document, container_id: &str) {
    let container = doc.shape(container_id).expect("container exists");
    let layout = container.layout.expect("auto layout present");

    let child_ids: Vec<String> = scene::children_of(doc, Some(container_id))
        .into_iter()
        .filter(|id| doc.shape(id).map(|s| s.auto_positioned).unwrap_or(false))
        .collect();
    let n = child_ids.len();
    if n == 0 {
        return;
    }

    let columns = layout
        .columns
        .filter(|&c| c > 0)
        .unwrap_or_else(|| (n as f32).sqrt().ceil() as usize);
    let rows = layout
        .rows
        .filter(|&r| r > 0)
        .unwrap_or_else(|| n.div_ceil(columns));

    let (cw, ch) = geometry::dimensions(container);
    let center = (container.x, container.y);

    let max_child_w = child_ids
        .iter()
        .filter_map(|id| doc.shape(id))
        .map(|s| geometry::dimensions(s).0)
        .fold(0.0_f32, f32::max);
    let max_child_h = child_ids
        .iter()
        .filter_map(|id| doc.shape(id))
        .map(|s| geometry::dimensions(s).1)
        .fold(0.0_f32, f32::max);

    let hug_w = sizing_along(container, true) == SizingMode::Hug;
    let hug_h = sizing_along(container, false) == SizingMode::Hug;

    let cell_w = match layout.cell_width_mode {
        SizingMode::Fixed if layout.cell_width > 0.0 => layout.cell_width,
        SizingMode::Fill if !hug_w => {
            let inner = cw - layout.padding * 2.0 - layout.spacing * (columns - 1) as f32;
            (inner / columns as f32).max(0.0)
        }
        _ => max_child_w,
    };
    let cell_h = match layout.cell_height_mode {
        SizingMode::Fixed if layout.cell_height > 0.0 => layout.cell_height,
        SizingMode::Fill if !hug_h => {
            let inner = ch - layout.padding * 2.0 - layout.spacing * (rows - 1) as f32;
            (inner / rows as f32).max(0.0)
        }
        _ => max_child_h,
    };

    let grid_w = cell_w * columns as f32 + layout.spacing * (columns - 1) as f32;
    let grid_h = cell_h * rows as f32 + layout.spacing * (rows - 1) as f32;
    let total_w = if hug_w { grid_w + layout.padding * 2.0 } else { cw };
    let total_h = if hug_h { grid_h + layout.padding * 2.0 } else { ch };

    {
        let container = doc.shape_mut(container_id).expect("container exists");
        if hug_w {
            set_extent(container, true, total_w);
        }
        if hug_h {
            set_extent(container, false, total_h);
        }
    }

    let left = center.0 - total_w / 2.0 + layout.padding;
    let top = center.1 - total_h / 2.0 + layout.padding;

    // Row-major placement of auto-positioned children, centered per cell.
    for (i, id) in child_ids.iter().enumerate() {
        let col = i % columns;
        let row = i / columns;
        let cx = left + col as f32 * (cell_w + layout.spacing) + cell_w / 2.0;
        let cy = top + row as f32 * (cell_h + layout.spacing) + cell_h / 2.0;
        let child = doc.shape_mut(id).expect("child exists");
        set_center_along(child, true, cx);
        set_center_along(child, false, cy);
    }
    trace!(container = container_id, children = n, rows, columns, "grid layout solved");
}
