//! The intent surface: every external edit intent is resolved into a pure
//! transform over the prior document snapshot. The engine decides whether
//! the result is a live preview or a committed transaction, reruns the
//! auto-layout solver, and keeps the scene-graph invariants intact.

use glam::Vec2;
use tracing::{debug, warn};

use crate::document::{
    AutoLayout, Color, Document, GradientKind, GradientStop, Page, PointKind, Shape, ShapeKind,
    StyleKind, EPSILON,
};
use crate::error::EngineError;
use crate::gesture::{GestureScratch, GestureState, GradientEnd};
use crate::gradient::{self, RasterBuffer, Rasterizer};
use crate::history::History;
use crate::path::{self, HandleSide, InsertOutcome};
use crate::{geometry, layout, scene};

/// Offset applied to duplicated and pasted shapes.
const PASTE_NUDGE: f32 = 8.0;

/// Acknowledgement for a property request, letting a caller reconcile
/// optimistic state against whether the request actually altered anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub version: u64,
    pub applied: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyRequest {
    Position { x: f32, y: f32 },
    Dimensions { width: f32, height: f32 },
    Rotation(f32),
    Opacity(f32),
    CornerRadius(f32),
    Arc { start: f32, sweep: f32, inner_ratio: f32 },
    Layout(Option<AutoLayout>),
    LayoutChild { auto_positioned: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    Left,
    Right,
    Top,
    Bottom,
    CenterHorizontal,
    CenterVertical,
}

/// Selection observation: the shape with its resolved parent and siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionInfo {
    pub shape: Shape,
    pub parent: Option<Shape>,
    pub siblings: Vec<String>,
}

/// Derived paint for one style slot, ready for the presentation layer.
/// Linear/radial gradients are expressed as native stop lists; angular and
/// diamond require a rasterized pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum PaintDescriptor {
    Solid(Color),
    Stops {
        kind: GradientKind,
        start: Vec2,
        end: Vec2,
        stops: Vec<GradientStop>,
    },
    Raster(RasterBuffer),
}

/// One entry of the z-ordered, layout-resolved list handed to the
/// presentation collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderShape {
    pub shape: Shape,
    pub fills: Vec<PaintDescriptor>,
    pub strokes: Vec<PaintDescriptor>,
}

/// The document/geometry engine. Single-threaded and event-driven: every
/// mutation executes synchronously in response to one discrete intent.
pub struct Engine {
    pub doc: Document,
    history: History,
    gesture: GestureState,
    selection: Vec<String>,
    clipboard: Vec<Vec<Shape>>,
    rasterizer: Rasterizer,
    version: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            doc: Document::new(),
            history: History::default(),
            gesture: GestureState::Idle,
            selection: Vec::new(),
            clipboard: Vec::new(),
            rasterizer: Rasterizer::new(),
            version: 0,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // --- Commit pipeline ---------------------------------------------------

    /// Runs a pure transform over the current snapshot as one committed
    /// transaction. The no-op guard discards mutations whose result is
    /// identical to the current snapshot, preventing churn loops between
    /// the solver and state updates.
    fn commit<F: FnOnce(&mut Document)>(&mut self, f: F) -> bool {
        let before = self.doc.clone();
        f(&mut self.doc);
        finalize(&mut self.doc);
        if self.doc.approx_eq(&before, EPSILON) {
            self.doc = before;
            return false;
        }
        self.history.record(before);
        self.version += 1;
        self.retain_valid_selection();
        true
    }

    fn retain_valid_selection(&mut self) {
        let doc = &self.doc;
        self.selection.retain(|id| doc.shape(id).is_some());
    }

    // --- Shape creation ----------------------------------------------------

    /// Creates a shape of `kind` with defaults resolved (id, name, active
    /// page) and inserts it at the top of its parent.
    pub fn create_shape(&mut self, kind: ShapeKind) -> String {
        self.create_shape_with(kind, |_| {})
    }

    pub fn create_shape_with<F>(&mut self, kind: ShapeKind, configure: F) -> String
    where
        F: FnOnce(&mut Shape),
    {
        let before = self.doc.clone();
        let id = self.doc.next_shape_id();
        let name = self.doc.next_default_name(kind);
        let mut shape = Shape::new(kind, id.clone(), name);
        shape.page_id = Some(self.doc.active_page_id.clone());
        configure(&mut shape);
        shape.id = id.clone();
        refresh_derived_points(&mut shape);
        let parent = shape.parent_id.clone();
        scene::insert_at_top(&mut self.doc, vec![shape], parent.as_deref());
        finalize(&mut self.doc);
        self.history.record(before);
        self.version += 1;
        debug!(shape = %id, ?kind, "shape created");
        id
    }

    pub fn delete_shapes(&mut self, ids: &[String]) -> bool {
        let ids = ids.to_vec();
        self.commit(move |doc| {
            for id in &ids {
                scene::remove_with_descendants(doc, id);
            }
        })
    }

    // --- Property requests -------------------------------------------------

    /// Applies one property request against a target shape. Unknown targets
    /// are no-ops acknowledged with `applied: false`, as are requests that
    /// change nothing.
    pub fn apply_property(&mut self, target: &str, request: PropertyRequest) -> Ack {
        if self.doc.shape(target).is_none() {
            return Ack {
                version: self.version,
                applied: false,
            };
        }
        let target = target.to_string();
        let applied = self.commit(move |doc| {
            apply_property_to(doc, &target, &request);
        });
        Ack {
            version: self.version,
            applied,
        }
    }

    // --- Alignment ---------------------------------------------------------

    /// Aligns the selected shapes against their union bounding box.
    pub fn align(&mut self, mode: AlignMode, ids: &[String]) -> bool {
        let ids = ids.to_vec();
        self.commit(move |doc| {
            let union = geometry::union_bounding_box(
                ids.iter()
                    .filter_map(|id| doc.shape(id))
                    .filter_map(geometry::bounding_box),
            );
            let Some(union) = union else {
                return;
            };
            for id in &ids {
                let Some(shape) = doc.shape(id) else { continue };
                let Some(b) = geometry::bounding_box(shape) else { continue };
                let (dx, dy) = match mode {
                    AlignMode::Left => (union.left - b.left, 0.0),
                    AlignMode::Right => (union.right - b.right, 0.0),
                    AlignMode::Top => (0.0, union.top - b.top),
                    AlignMode::Bottom => (0.0, union.bottom - b.bottom),
                    AlignMode::CenterHorizontal => (union.center().x - b.center().x, 0.0),
                    AlignMode::CenterVertical => (0.0, union.center().y - b.center().y),
                };
                translate_shape(doc, id, Vec2::new(dx, dy));
            }
        })
    }

    // --- Duplicate / clipboard ---------------------------------------------

    /// Duplicates the selected subtrees, each copy nudged and painted just
    /// above its source. Returns the new root ids.
    pub fn duplicate(&mut self, ids: &[String]) -> Vec<String> {
        let roots = selection_roots(&self.doc, ids);
        let mut new_ids = Vec::with_capacity(roots.len());
        let before = self.doc.clone();
        for id in &roots {
            if self.doc.index_of(id).is_none() {
                continue;
            }
            let source: Vec<Shape> = scene::subtree_ids(&self.doc, id)
                .iter()
                .filter_map(|sid| self.doc.shape(sid).cloned())
                .collect();
            let block = reid_block(&mut self.doc, source, Vec2::splat(PASTE_NUDGE));
            new_ids.push(block[0].id.clone());
            scene::insert_above_sibling(&mut self.doc, block, id);
        }
        if new_ids.is_empty() {
            return new_ids;
        }
        finalize(&mut self.doc);
        self.history.record(before);
        self.version += 1;
        new_ids
    }

    pub fn copy(&mut self, ids: &[String]) {
        let roots = selection_roots(&self.doc, ids);
        self.clipboard = roots
            .iter()
            .map(|id| {
                scene::subtree_ids(&self.doc, id)
                    .iter()
                    .filter_map(|sid| self.doc.shape(sid).cloned())
                    .collect()
            })
            .collect();
    }

    pub fn cut(&mut self, ids: &[String]) {
        self.copy(ids);
        self.delete_shapes(ids);
    }

    /// Pastes the clipboard at the root of the active page. Returns the new
    /// root ids.
    pub fn paste(&mut self) -> Vec<String> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        let before = self.doc.clone();
        let page = self.doc.active_page_id.clone();
        let blocks = self.clipboard.clone();
        let mut new_ids = Vec::with_capacity(blocks.len());
        for block in blocks {
            let mut block = reid_block(&mut self.doc, block, Vec2::splat(PASTE_NUDGE));
            block[0].parent_id = None;
            for shape in &mut block {
                shape.page_id = Some(page.clone());
            }
            new_ids.push(block[0].id.clone());
            scene::insert_at_top(&mut self.doc, block, None);
        }
        finalize(&mut self.doc);
        self.history.record(before);
        self.version += 1;
        new_ids
    }

    // --- Grouping ----------------------------------------------------------

    pub fn group(&mut self, ids: &[String]) -> Option<String> {
        let before = self.doc.clone();
        let group_id = scene::group_shapes(&mut self.doc, ids)?;
        finalize(&mut self.doc);
        self.history.record(before);
        self.version += 1;
        self.selection = vec![group_id.clone()];
        Some(group_id)
    }

    pub fn ungroup(&mut self, group_id: &str) -> Vec<String> {
        let before = self.doc.clone();
        let child_ids = scene::ungroup(&mut self.doc, group_id);
        if child_ids.is_empty() {
            self.doc = before;
            return child_ids;
        }
        finalize(&mut self.doc);
        self.history.record(before);
        self.version += 1;
        self.selection = child_ids.clone();
        child_ids
    }

    // --- History -----------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.undo(self.doc.clone()) {
            Some(restored) => {
                self.doc = restored;
                self.version += 1;
                self.retain_valid_selection();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        match self.history.redo(self.doc.clone()) {
            Some(restored) => {
                self.doc = restored;
                self.version += 1;
                self.retain_valid_selection();
                true
            }
            None => false,
        }
    }

    // --- Gestures ----------------------------------------------------------

    /// Begins a translate gesture over a set of shapes.
    pub fn begin_drag(&mut self, ids: &[String], origin: Vec2) -> bool {
        let ids: Vec<String> = ids
            .iter()
            .filter(|id| self.doc.shape(id).map(|s| !s.locked).unwrap_or(false))
            .cloned()
            .collect();
        if ids.is_empty() {
            return false;
        }
        self.gesture
            .begin(self.doc.clone(), GestureScratch::Drag { ids, origin })
    }

    pub fn begin_resize(&mut self, id: &str, origin: Vec2) -> bool {
        if self.doc.shape(id).is_none() {
            return false;
        }
        self.gesture.begin(
            self.doc.clone(),
            GestureScratch::Resize {
                id: id.to_string(),
                origin,
            },
        )
    }

    pub fn begin_rotate(&mut self, id: &str, origin: Vec2) -> bool {
        if self.doc.shape(id).is_none() {
            return false;
        }
        self.gesture.begin(
            self.doc.clone(),
            GestureScratch::Rotate {
                id: id.to_string(),
                origin,
            },
        )
    }

    pub fn begin_path_handle(
        &mut self,
        id: &str,
        index: usize,
        side: HandleSide,
        break_symmetry: bool,
    ) -> bool {
        let valid = self
            .doc
            .shape(id)
            .map(|s| s.kind == ShapeKind::Path && index < s.points.len())
            .unwrap_or(false);
        if !valid {
            return false;
        }
        self.gesture.begin(
            self.doc.clone(),
            GestureScratch::PathHandle {
                id: id.to_string(),
                index,
                side,
                break_symmetry,
            },
        )
    }

    pub fn begin_path_anchor(&mut self, id: &str, index: usize) -> bool {
        let valid = self
            .doc
            .shape(id)
            .map(|s| s.kind == ShapeKind::Path && index < s.points.len())
            .unwrap_or(false);
        if !valid {
            return false;
        }
        self.gesture.begin(
            self.doc.clone(),
            GestureScratch::PathAnchor {
                id: id.to_string(),
                index,
            },
        )
    }

    pub fn begin_gradient_handle(&mut self, id: &str, fill_index: usize, end: GradientEnd) -> bool {
        let valid = self
            .doc
            .shape(id)
            .and_then(|s| s.fills.get(fill_index))
            .map(|style| style.kind == StyleKind::Gradient)
            .unwrap_or(false);
        if !valid {
            return false;
        }
        self.gesture.begin(
            self.doc.clone(),
            GestureScratch::GradientHandle {
                id: id.to_string(),
                fill_index,
                end,
            },
        )
    }

    /// Recomputes the live preview for the active gesture against the fixed
    /// baseline captured at begin, never against the prior frame.
    pub fn update_gesture(&mut self, pointer: Vec2) {
        let (Some(baseline), Some(scratch)) = (self.gesture.baseline(), self.gesture.scratch())
        else {
            return;
        };
        let mut preview = baseline.clone();
        let scratch = scratch.clone();
        apply_gesture(&mut preview, &scratch, pointer);
        for id in scratch_targets(&scratch) {
            layout::resolve_layout_upward(&mut preview, &id);
        }
        self.doc = preview;
    }

    /// Ends the gesture: the final state is diffed against the baseline and
    /// recorded as exactly one transaction if materially different.
    pub fn commit_gesture(&mut self) -> bool {
        let Some((baseline, scratch)) = self.gesture.take() else {
            return false;
        };
        finalize(&mut self.doc);
        if self.doc.approx_eq(&baseline, EPSILON) {
            self.doc = baseline;
            return false;
        }
        // A committed structural point edit makes a converted path permanent.
        if let GestureScratch::PathHandle { id, .. } | GestureScratch::PathAnchor { id, .. } =
            &scratch
        {
            if let Some(shape) = self.doc.shape_mut(id) {
                shape.path_source = None;
                shape.base_points = None;
            }
        }
        self.history.record(baseline);
        self.version += 1;
        self.retain_valid_selection();
        true
    }

    /// Discards the preview and restores the baseline verbatim.
    pub fn cancel_gesture(&mut self) {
        if let Some((baseline, _)) = self.gesture.take() {
            self.doc = baseline;
        }
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture.is_active()
    }

    // --- Path editing intents ----------------------------------------------

    /// Converts a shape into an editable path, retaining the original for a
    /// lossless revert while no point has been edited.
    pub fn convert_to_path(&mut self, id: &str) -> bool {
        let Some(shape) = self.doc.shape(id).cloned() else {
            return false;
        };
        if shape.kind == ShapeKind::Path {
            return false;
        }
        let converted = path::convert_to_path(&shape);
        self.commit(move |doc| {
            if let Some(slot) = doc.shape_mut(id) {
                *slot = converted;
            }
        })
    }

    /// Exits anchor editing: if no point was ever structurally edited the
    /// retained original is restored losslessly; otherwise the path is
    /// already permanent and nothing changes.
    pub fn end_path_editing(&mut self, id: &str) -> bool {
        let Some(original) = self.doc.shape(id).and_then(path::revert_conversion) else {
            return false;
        };
        self.commit(move |doc| {
            if let Some(slot) = doc.shape_mut(id) {
                *slot = original;
            }
        })
    }

    /// Inserts a point on the nearest segment within tolerance, or closes
    /// the path when the pick lands on its first point.
    pub fn insert_path_point(&mut self, id: &str, pick: Vec2) -> InsertOutcome {
        let Some(shape) = self.doc.shape(id) else {
            return InsertOutcome::Missed;
        };
        if shape.kind != ShapeKind::Path {
            return InsertOutcome::Missed;
        }
        let tolerance = geometry::hit_tolerance(shape).max(6.0);
        let mut outcome = InsertOutcome::Missed;
        self.commit(|doc| {
            if let Some(shape) = doc.shape_mut(id) {
                path::apply_points_transform(shape, |points, closed| {
                    outcome = path::insert_point(points, closed, pick, tolerance);
                });
            }
        });
        outcome
    }

    pub fn delete_path_point(&mut self, id: &str, index: usize) -> bool {
        self.commit(|doc| {
            if let Some(shape) = doc.shape_mut(id) {
                path::apply_points_transform(shape, |points, _| {
                    path::delete_point(points, index);
                });
            }
        })
    }

    pub fn retype_path_point(&mut self, id: &str, index: usize, kind: PointKind) -> bool {
        self.commit(|doc| {
            if let Some(shape) = doc.shape_mut(id) {
                path::apply_points_transform(shape, |points, _| {
                    path::retype_point(points, index, kind);
                });
            }
        })
    }

    // --- Scene order intents -----------------------------------------------

    pub fn move_to_parent_top(&mut self, id: &str, new_parent: Option<&str>) -> bool {
        let id = id.to_string();
        let new_parent = new_parent.map(str::to_string);
        self.commit(move |doc| {
            scene::move_to_parent_top(doc, &id, new_parent.as_deref());
        })
    }

    pub fn reorder_children(&mut self, parent: Option<&str>, order: &[String]) -> bool {
        let parent = parent.map(str::to_string);
        let order = order.to_vec();
        self.commit(move |doc| {
            scene::reorder_children(doc, parent.as_deref(), &order);
        })
    }

    // --- Pages -------------------------------------------------------------

    pub fn add_page(&mut self, name: Option<String>) -> String {
        let before = self.doc.clone();
        let id = self.doc.next_page_id();
        let name = name.unwrap_or_else(|| format!("Page {}", self.doc.pages.len() + 1));
        self.doc.pages.push(Page {
            id: id.clone(),
            name,
            created_at: self.doc.id_counter,
        });
        self.doc.active_page_id = id.clone();
        self.history.record(before);
        self.version += 1;
        id
    }

    pub fn activate_page(&mut self, id: &str) -> bool {
        if self.doc.page(id).is_none() {
            return false;
        }
        let id = id.to_string();
        self.commit(move |doc| {
            doc.active_page_id = id;
        })
    }

    pub fn rename_page(&mut self, id: &str, name: &str) -> bool {
        let id = id.to_string();
        let name = name.to_string();
        self.commit(move |doc| {
            if let Some(page) = doc.pages.iter_mut().find(|p| p.id == id) {
                page.name = name;
            }
        })
    }

    /// Duplicates a page together with a deep copy of its shapes.
    pub fn duplicate_page(&mut self, id: &str) -> Option<String> {
        let source = self.doc.page(id)?.clone();
        let before = self.doc.clone();
        let new_id = self.doc.next_page_id();
        self.doc.pages.push(Page {
            id: new_id.clone(),
            name: format!("{} copy", source.name),
            created_at: self.doc.id_counter,
        });
        for root in scene::roots_of_page(&self.doc, id) {
            let source_block: Vec<Shape> = scene::subtree_ids(&self.doc, &root)
                .iter()
                .filter_map(|sid| self.doc.shape(sid).cloned())
                .collect();
            let mut block = reid_block(&mut self.doc, source_block, Vec2::ZERO);
            for shape in &mut block {
                shape.page_id = Some(new_id.clone());
            }
            scene::insert_at_top(&mut self.doc, block, None);
        }
        self.history.record(before);
        self.version += 1;
        Some(new_id)
    }

    /// Deleting the last remaining page is the one reportable failure; the
    /// document is left unchanged.
    pub fn delete_page(&mut self, id: &str) -> Result<bool, EngineError> {
        if self.doc.page(id).is_none() {
            return Ok(false);
        }
        if self.doc.pages.len() <= 1 {
            return Err(EngineError::LastPage);
        }
        let id = id.to_string();
        let changed = self.commit(move |doc| {
            let doomed: Vec<String> = doc
                .shapes
                .iter()
                .filter(|s| doc.resolved_page_id(s) == id)
                .map(|s| s.id.clone())
                .collect();
            for sid in doomed {
                if doc.index_of(&sid).is_some() {
                    scene::remove_with_descendants(doc, &sid);
                }
            }
            doc.pages.retain(|p| p.id != id);
            if doc.active_page_id == id {
                doc.active_page_id = doc.pages[0].id.clone();
            }
        });
        Ok(changed)
    }

    pub fn reorder_pages(&mut self, order: &[String]) -> bool {
        let order = order.to_vec();
        self.commit(move |doc| {
            let mut reordered: Vec<Page> = order
                .iter()
                .filter_map(|id| doc.pages.iter().find(|p| &p.id == id).cloned())
                .collect();
            for page in &doc.pages {
                if !reordered.iter().any(|p| p.id == page.id) {
                    reordered.push(page.clone());
                }
            }
            doc.pages = reordered;
        })
    }

    // --- Selection observation ---------------------------------------------

    pub fn set_selection(&mut self, ids: Vec<String>) -> Option<SelectionInfo> {
        self.selection = ids
            .into_iter()
            .filter(|id| self.doc.shape(id).is_some())
            .collect();
        self.selection_info()
    }

    pub fn selected_ids(&self) -> &[String] {
        &self.selection
    }

    /// The primary selected shape with its resolved parent and siblings, or
    /// `None` when nothing is selected.
    pub fn selection_info(&self) -> Option<SelectionInfo> {
        let id = self.selection.first()?;
        let shape = self.doc.shape(id)?.clone();
        let parent = shape
            .parent_id
            .as_deref()
            .and_then(|pid| self.doc.shape(pid))
            .cloned();
        let siblings = scene::children_of(&self.doc, shape.parent_id.as_deref());
        Some(SelectionInfo {
            shape,
            parent,
            siblings,
        })
    }

    // --- Presentation boundary ---------------------------------------------

    /// The z-ordered, layout-resolved shape list for the active page, with
    /// derived paint descriptors. Angular/diamond gradient buffers come out
    /// of the bounded raster cache.
    pub fn render_list(&mut self) -> Vec<RenderShape> {
        let ids: Vec<String> = self
            .doc
            .shapes
            .iter()
            .filter(|s| self.doc.resolved_page_id(s) == self.doc.active_page_id)
            .map(|s| s.id.clone())
            .collect();
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let shape = self.doc.shape(&id).expect("listed shape exists").clone();
            let (w, h) = geometry::dimensions(&shape);
            let fills = shape
                .fills
                .iter()
                .map(|s| paint_descriptor(s, w, h, &mut self.rasterizer))
                .collect();
            let strokes = shape
                .strokes
                .iter()
                .map(|s| paint_descriptor(s, w, h, &mut self.rasterizer))
                .collect();
            out.push(RenderShape {
                shape,
                fills,
                strokes,
            });
        }
        out
    }

    /// Hit-testing entry: topmost unlocked, visible shape containing the
    /// point on the active page.
    pub fn shape_at(&self, point: Vec2) -> Option<String> {
        self.doc
            .shapes
            .iter()
            .rev()
            .filter(|s| {
                s.visible && !s.locked && self.doc.resolved_page_id(s) == self.doc.active_page_id
            })
            .find(|s| geometry::point_in_shape(s, point))
            .map(|s| s.id.clone())
    }

    // --- Persistence boundary ----------------------------------------------

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.doc).unwrap_or_else(|_| "{}".to_string())
    }

    /// Loads a stored document permissively: missing fields default and
    /// malformed data is ignored rather than rejected.
    pub fn load_json(&mut self, data: &str) {
        let doc = match serde_json::from_str::<Document>(data) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(%err, "stored document is malformed; starting fresh");
                Document::new()
            }
        };
        self.load(doc);
    }

    pub fn load(&mut self, mut doc: Document) {
        if doc.pages.is_empty() {
            doc.pages.push(Page {
                id: "page-1".to_string(),
                name: "Page 1".to_string(),
                created_at: 0,
            });
        }
        if doc.page(&doc.active_page_id).is_none() {
            doc.active_page_id = doc.pages[0].id.clone();
        }
        doc.rebuild_counters();
        scene::self_heal_orphans(&mut doc);
        layout::solve_all(&mut doc);
        self.doc = doc;
        self.history.clear();
        self.gesture = GestureState::Idle;
        self.selection.clear();
        self.version += 1;
    }
}

/// Post-mutation invariants: empty groups are pruned and auto-layout is
/// re-solved bottom-up.
fn finalize(doc: &mut Document) {
    scene::prune_empty_groups(doc);
    layout::solve_all(doc);
}

fn apply_property_to(doc: &mut Document, target: &str, request: &PropertyRequest) {
    match request {
        PropertyRequest::Position { x, y } => {
            let delta = doc
                .shape(target)
                .map(|s| Vec2::new(x - s.x, y - s.y))
                .unwrap_or(Vec2::ZERO);
            translate_shape(doc, target, delta);
        }
        PropertyRequest::Dimensions { width, height } => {
            if let Some(shape) = doc.shape_mut(target) {
                set_dimensions(shape, *width, *height);
                refresh_derived_points(shape);
            }
        }
        PropertyRequest::Rotation(degrees) => {
            if let Some(shape) = doc.shape_mut(target) {
                set_rotation(shape, *degrees);
            }
        }
        PropertyRequest::Opacity(value) => {
            if let Some(shape) = doc.shape_mut(target) {
                shape.opacity = value.clamp(0.0, 1.0);
            }
        }
        PropertyRequest::CornerRadius(radius) => {
            if let Some(shape) = doc.shape_mut(target) {
                let radius = radius.max(0.0);
                if shape.kind == ShapeKind::Path {
                    path::set_corner_radius(shape, radius);
                } else {
                    shape.corner_radius = radius;
                    refresh_derived_points(shape);
                }
            }
        }
        PropertyRequest::Arc {
            start,
            sweep,
            inner_ratio,
        } => {
            if let Some(shape) = doc.shape_mut(target) {
                if matches!(shape.kind, ShapeKind::Circle | ShapeKind::Ellipse) {
                    shape.arc_start = *start;
                    shape.arc_sweep = sweep.clamp(-360.0, 360.0);
                    shape.inner_radius_ratio = inner_ratio.clamp(0.0, 1.0);
                }
            }
        }
        PropertyRequest::Layout(layout) => {
            if let Some(shape) = doc.shape_mut(target) {
                if shape.is_container() {
                    shape.layout = *layout;
                }
            }
        }
        PropertyRequest::LayoutChild { auto_positioned } => {
            if let Some(shape) = doc.shape_mut(target) {
                shape.auto_positioned = *auto_positioned;
            }
        }
    }
}

/// Translates a shape and, for point-based kinds, its points and handles.
fn translate_shape(doc: &mut Document, id: &str, delta: Vec2) {
    if delta == Vec2::ZERO {
        return;
    }
    let subtree = scene::subtree_ids(doc, id);
    for sid in subtree {
        if let Some(shape) = doc.shape_mut(&sid) {
            shape.x += delta.x;
            shape.y += delta.y;
            translate_points(shape, delta);
        }
    }
}

fn translate_points(shape: &mut Shape, delta: Vec2) {
    for p in &mut shape.points {
        p.x += delta.x;
        p.y += delta.y;
        p.handle_left = p.handle_left.map(|h| h + delta);
        p.handle_right = p.handle_right.map(|h| h + delta);
    }
    if let Some(base) = shape.base_points.as_mut() {
        for p in base.iter_mut() {
            p.x += delta.x;
            p.y += delta.y;
            p.handle_left = p.handle_left.map(|h| h + delta);
            p.handle_right = p.handle_right.map(|h| h + delta);
        }
    }
}

fn set_dimensions(shape: &mut Shape, width: f32, height: f32) {
    let width = width.max(0.0);
    let height = height.max(0.0);
    match shape.kind {
        ShapeKind::Frame | ShapeKind::Group | ShapeKind::Rectangle | ShapeKind::Text => {
            shape.width = Some(width);
            shape.height = Some(height);
        }
        ShapeKind::Circle => {
            shape.radius = Some(width.max(height) / 2.0);
        }
        ShapeKind::Ellipse => {
            shape.radius_x = Some(width / 2.0);
            shape.radius_y = Some(height / 2.0);
        }
        ShapeKind::Polygon | ShapeKind::RoundedPolygon => {
            shape.radius = Some(width.max(height) / 2.0);
        }
        ShapeKind::Line | ShapeKind::Path => {
            scale_points_to(shape, width, height);
        }
    }
}

/// Scales a point-based shape about its bounding-box center to new extents.
fn scale_points_to(shape: &mut Shape, width: f32, height: f32) {
    let Some(b) = geometry::bounding_box(shape) else {
        return;
    };
    let (ow, oh) = (b.width(), b.height());
    let sx = if ow > f32::EPSILON { width / ow } else { 1.0 };
    let sy = if oh > f32::EPSILON { height / oh } else { 1.0 };
    let center = b.center();
    let scale = |p: Vec2| -> Vec2 {
        center + (p - center) * Vec2::new(sx, sy)
    };
    for p in &mut shape.points {
        let a = scale(p.anchor());
        p.set_anchor(a);
        p.handle_left = p.handle_left.map(scale);
        p.handle_right = p.handle_right.map(scale);
    }
}

fn set_rotation(shape: &mut Shape, degrees: f32) {
    match shape.kind {
        // Point-based shapes bake rotation into their points.
        ShapeKind::Line | ShapeKind::Path => {
            let delta = (degrees - shape.rotation).to_radians();
            let center = geometry::bounding_box(shape)
                .map(|b| b.center())
                .unwrap_or(Vec2::new(shape.x, shape.y));
            let (sin, cos) = delta.sin_cos();
            let rotate = |p: Vec2| -> Vec2 {
                let d = p - center;
                center + Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
            };
            for p in &mut shape.points {
                let a = rotate(p.anchor());
                p.set_anchor(a);
                p.handle_left = p.handle_left.map(rotate);
                p.handle_right = p.handle_right.map(rotate);
            }
        }
        _ => {
            shape.rotation = degrees;
            refresh_derived_points(shape);
        }
    }
}

/// Polygon kinds carry an explicit silhouette so the geometry kernel can use
/// the real point-set box; it is re-derived after any geometry edit.
fn refresh_derived_points(shape: &mut Shape) {
    if matches!(shape.kind, ShapeKind::Polygon | ShapeKind::RoundedPolygon) {
        shape.points = path::silhouette_points(shape).0;
    }
}

fn apply_gesture(doc: &mut Document, scratch: &GestureScratch, pointer: Vec2) {
    match scratch {
        GestureScratch::Drag { ids, origin } => {
            let delta = pointer - *origin;
            for id in ids {
                translate_shape(doc, id, delta);
            }
        }
        GestureScratch::Resize { id, .. } => {
            if let Some(shape) = doc.shape_mut(id) {
                let center = Vec2::new(shape.x, shape.y);
                let extent = (pointer - center).abs() * 2.0;
                set_dimensions(shape, extent.x, extent.y);
                refresh_derived_points(shape);
            }
        }
        GestureScratch::Rotate { id, origin } => {
            if let Some(shape) = doc.shape_mut(id) {
                let center = Vec2::new(shape.x, shape.y);
                let from = (*origin - center).y.atan2((*origin - center).x);
                let to = (pointer - center).y.atan2((pointer - center).x);
                let base = shape.rotation;
                set_rotation(shape, base + (to - from).to_degrees());
            }
        }
        GestureScratch::PathHandle {
            id,
            index,
            side,
            break_symmetry,
        } => {
            if let Some(shape) = doc.shape_mut(id) {
                path::move_handle(&mut shape.points, *index, *side, pointer, *break_symmetry);
            }
        }
        GestureScratch::PathAnchor { id, index } => {
            if let Some(shape) = doc.shape_mut(id) {
                path::move_anchor(&mut shape.points, *index, pointer);
            }
        }
        GestureScratch::GradientHandle {
            id,
            fill_index,
            end,
        } => {
            if let Some(shape) = doc.shape_mut(id) {
                let center = Vec2::new(shape.x, shape.y);
                let (w, h) = geometry::dimensions(shape);
                let handle = gradient::local_to_handle(pointer - center, w, h);
                if let Some(g) = shape
                    .fills
                    .get_mut(*fill_index)
                    .and_then(|s| s.gradient.as_mut())
                {
                    match end {
                        GradientEnd::Start => g.handles.start = handle,
                        GradientEnd::End => g.handles.end = handle,
                    }
                    *g = gradient::normalize(g);
                }
            }
        }
    }
}

fn scratch_targets(scratch: &GestureScratch) -> Vec<String> {
    match scratch {
        GestureScratch::Drag { ids, .. } => ids.clone(),
        GestureScratch::Resize { id, .. }
        | GestureScratch::Rotate { id, .. }
        | GestureScratch::PathHandle { id, .. }
        | GestureScratch::PathAnchor { id, .. }
        | GestureScratch::GradientHandle { id, .. } => vec![id.clone()],
    }
}

/// Roots of a selection: ids whose ancestors are not themselves selected.
fn selection_roots(doc: &Document, ids: &[String]) -> Vec<String> {
    let mut roots: Vec<String> = Vec::new();
    for id in ids {
        if doc.shape(id).is_none() {
            continue;
        }
        let mut ancestor_selected = false;
        let mut current = id.clone();
        while let Some(parent) = doc.shape(&current).and_then(|s| s.parent_id.clone()) {
            if ids.contains(&parent) {
                ancestor_selected = true;
                break;
            }
            current = parent;
        }
        if !ancestor_selected && !roots.contains(id) {
            roots.push(id.clone());
        }
    }
    roots.sort_by_key(|id| doc.index_of(id).unwrap_or(usize::MAX));
    roots
}

/// Deep-copies a block with fresh ids, remapping internal parent references
/// and nudging every shape by `offset`.
fn reid_block(doc: &mut Document, source: Vec<Shape>, offset: Vec2) -> Vec<Shape> {
    let mut mapping: Vec<(String, String)> = Vec::with_capacity(source.len());
    let mut block = Vec::with_capacity(source.len());
    for mut shape in source {
        let new_id = doc.next_shape_id();
        mapping.push((shape.id.clone(), new_id.clone()));
        shape.id = new_id;
        shape.x += offset.x;
        shape.y += offset.y;
        translate_points(&mut shape, offset);
        block.push(shape);
    }
    for shape in &mut block {
        if let Some(pid) = shape.parent_id.clone() {
            if let Some((_, new)) = mapping.iter().find(|(old, _)| *old == pid) {
                shape.parent_id = Some(new.clone());
            }
        }
    }
    block
}

fn paint_descriptor(
    style: &crate::document::Style,
    width: f32,
    height: f32,
    rasterizer: &mut Rasterizer,
) -> PaintDescriptor {
    match style.kind {
        StyleKind::Solid => PaintDescriptor::Solid(style.color),
        StyleKind::Gradient => {
            let Some(gradient) = style.gradient.as_ref() else {
                return PaintDescriptor::Solid(style.color);
            };
            let normalized = gradient::normalize(gradient);
            if normalized.stops.len() < 2 {
                let (color, opacity) = gradient::fallback_color(&normalized);
                return PaintDescriptor::Solid(Color { a: color.a * opacity, ..color });
            }
            if gradient::needs_raster(normalized.kind) {
                let w = width.ceil().max(1.0) as u32;
                let h = height.ceil().max(1.0) as u32;
                PaintDescriptor::Raster(rasterizer.raster(&normalized, w, h))
            } else {
                PaintDescriptor::Stops {
                    kind: normalized.kind,
                    start: gradient::handle_to_local(normalized.handles.start, width, height),
                    end: gradient::handle_to_local(normalized.handles.end, width, height),
                    stops: normalized.stops.clone(),
                }
            }
        }
    }
}
