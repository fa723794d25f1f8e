//! Structural scene-graph operations over the ordered shape list.
//!
//! Paint order is list order (later paints on top) and the list is kept in
//! depth-first order, so every shape's subtree occupies a contiguous block.
//! All operations here move whole blocks, which preserves both invariants.

use tracing::{debug, warn};

use crate::document::{Document, Shape, ShapeKind};
use crate::geometry;

/// Direct children of `parent` (or root shapes when `None`), in paint order.
pub fn children_of(doc: &Document, parent: Option<&str>) -> Vec<String> {
    doc.shapes
        .iter()
        .filter(|s| s.parent_id.as_deref() == parent)
        .map(|s| s.id.clone())
        .collect()
}

/// All descendants of `id` in document (paint) order.
pub fn descendants_of(doc: &Document, id: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut frontier = vec![id.to_string()];
    while let Some(current) = frontier.pop() {
        for child in children_of(doc, Some(&current)) {
            out.push(child.clone());
            frontier.push(child);
        }
    }
    // Re-sort to document order; the walk above is not.
    out.sort_by_key(|cid| doc.index_of(cid).unwrap_or(usize::MAX));
    out
}

/// Root shapes belonging to a page, in paint order.
pub fn roots_of_page(doc: &Document, page_id: &str) -> Vec<String> {
    doc.shapes
        .iter()
        .filter(|s| s.parent_id.is_none() && doc.resolved_page_id(s) == page_id)
        .map(|s| s.id.clone())
        .collect()
}

/// The subtree of `id` (the shape plus its descendants) in document order.
pub fn subtree_ids(doc: &Document, id: &str) -> Vec<String> {
    let mut out = vec![id.to_string()];
    out.extend(descendants_of(doc, id));
    out
}

/// Removes and returns the subtree of `id`, preserving internal order.
pub fn extract_subtree(doc: &mut Document, id: &str) -> Vec<Shape> {
    let ids = subtree_ids(doc, id);
    let mut out = Vec::with_capacity(ids.len());
    for sid in &ids {
        if let Some(idx) = doc.index_of(sid) {
            out.push(doc.shapes.remove(idx));
        }
    }
    out
}

/// Index just past `parent`'s subtree block; inserting here paints on top of
/// every existing child. For the root, this is the end of the list.
pub fn top_insert_index(doc: &Document, parent: Option<&str>) -> usize {
    match parent {
        Some(pid) => match doc.index_of(pid) {
            Some(idx) => idx + subtree_ids(doc, pid).len(),
            None => doc.shapes.len(),
        },
        None => doc.shapes.len(),
    }
}

/// Inserts a block at the top of `parent`, re-tagging the block root's
/// parent reference.
pub fn insert_at_top(doc: &mut Document, mut block: Vec<Shape>, parent: Option<&str>) {
    if block.is_empty() {
        return;
    }
    block[0].parent_id = parent.map(str::to_string);
    let at = top_insert_index(doc, parent);
    doc.shapes.splice(at..at, block);
}

/// Inserts a block immediately above a same-parent sibling, so the new
/// shape paints strictly after the anchor. Falls back to top insertion when
/// the anchor is missing or under a different parent.
pub fn insert_above_sibling(doc: &mut Document, block: Vec<Shape>, anchor_id: &str) {
    if block.is_empty() {
        return;
    }
    let parent = block[0].parent_id.clone();
    let anchor_matches = doc
        .shape(anchor_id)
        .map(|a| a.parent_id == parent)
        .unwrap_or(false);
    if !anchor_matches {
        insert_at_top(doc, block, parent.as_deref());
        return;
    }
    let at = doc.index_of(anchor_id).expect("anchor exists") + subtree_ids(doc, anchor_id).len();
    doc.shapes.splice(at..at, block);
}

/// Reparents a subtree and reinserts it at the new parent's top.
pub fn move_to_parent_top(doc: &mut Document, id: &str, new_parent: Option<&str>) {
    if doc.index_of(id).is_none() {
        return;
    }
    // Reparenting under one's own descendant would create a cycle.
    if let Some(np) = new_parent {
        if np == id || subtree_ids(doc, id).iter().any(|s| s == np) {
            return;
        }
    }
    let block = extract_subtree(doc, id);
    insert_at_top(doc, block, new_parent);
}

/// Rewrites one parent's contiguous child block to the requested order,
/// leaving unrelated shapes' positions untouched. Children missing from the
/// request keep their relative order after the requested ones.
pub fn reorder_children(doc: &mut Document, parent: Option<&str>, order: &[String]) {
    let current = children_of(doc, parent);
    if current.is_empty() {
        return;
    }
    let mut sequence: Vec<String> = order
        .iter()
        .filter(|id| current.contains(*id))
        .cloned()
        .collect();
    for id in &current {
        if !sequence.contains(id) {
            sequence.push(id.clone());
        }
    }

    let block_start = doc.index_of(&current[0]).expect("child exists");
    let mut blocks: Vec<Vec<Shape>> = Vec::with_capacity(sequence.len());
    for id in &sequence {
        blocks.push(extract_subtree(doc, id));
    }
    let mut at = block_start;
    for block in blocks {
        let len = block.len();
        doc.shapes.splice(at..at, block);
        at += len;
    }
}

/// Groups same-parent, same-page shapes: the new group takes their union
/// bounding box as its frame, members keep relative order, and the group is
/// inserted where the topmost selected member painted.
pub fn group_shapes(doc: &mut Document, ids: &[String]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    let mut members: Vec<&Shape> = Vec::with_capacity(ids.len());
    for id in ids {
        members.push(doc.shape(id)?);
    }
    let parent = members[0].parent_id.clone();
    let page = doc.resolved_page_id(members[0]).to_string();
    if !members
        .iter()
        .all(|m| m.parent_id == parent && doc.resolved_page_id(m) == page)
    {
        return None;
    }

    let union = geometry::union_bounding_box(
        members.iter().filter_map(|m| geometry::bounding_box(m)),
    )?;

    // Extraction shifts indices; count how far the topmost member's block
    // start moves once every selected block before it is gone.
    let mut ordered: Vec<String> = ids.to_vec();
    ordered.sort_by_key(|id| doc.index_of(id).unwrap_or(usize::MAX));
    let top_id = ordered.last().expect("non-empty selection").clone();
    let top_start = doc.index_of(&top_id).expect("member exists");
    let shift: usize = ordered
        .iter()
        .filter(|id| doc.index_of(id).unwrap_or(usize::MAX) < top_start)
        .map(|id| subtree_ids(doc, id).len())
        .sum();
    let insert_at = top_start - shift;

    let group_id = doc.next_shape_id();
    let group_name = doc.next_default_name(ShapeKind::Group);
    let mut group = Shape::new(ShapeKind::Group, group_id.clone(), group_name);
    group.parent_id = parent;
    group.page_id = Some(page);
    let center = union.center();
    group.x = center.x;
    group.y = center.y;
    group.width = Some(union.width());
    group.height = Some(union.height());

    let mut blocks: Vec<Vec<Shape>> = Vec::with_capacity(ordered.len());
    for id in &ordered {
        let mut block = extract_subtree(doc, id);
        block[0].parent_id = Some(group_id.clone());
        blocks.push(block);
    }

    doc.shapes.insert(insert_at, group);
    let mut at = insert_at + 1;
    for block in blocks {
        let len = block.len();
        doc.shapes.splice(at..at, block);
        at += len;
    }
    debug!(group = %group_id, members = ids.len(), "grouped shapes");
    Some(group_id)
}

/// Dissolves a group: children reparent to the group's former parent at its
/// former paint position, and the group is removed.
pub fn ungroup(doc: &mut Document, group_id: &str) -> Vec<String> {
    let Some(group) = doc.shape(group_id) else {
        return Vec::new();
    };
    if group.kind != ShapeKind::Group {
        return Vec::new();
    }
    let parent = group.parent_id.clone();
    let child_ids = children_of(doc, Some(group_id));

    let group_index = doc.index_of(group_id).expect("group exists");
    let mut blocks: Vec<Vec<Shape>> = Vec::with_capacity(child_ids.len());
    for id in &child_ids {
        let mut block = extract_subtree(doc, id);
        block[0].parent_id = parent.clone();
        blocks.push(block);
    }
    doc.shapes.remove(group_index);
    let mut at = group_index;
    for block in blocks {
        let len = block.len();
        doc.shapes.splice(at..at, block);
        at += len;
    }
    child_ids
}

/// Removes a shape and all its descendants.
pub fn remove_with_descendants(doc: &mut Document, id: &str) -> usize {
    let removed = extract_subtree(doc, id);
    removed.len()
}

/// Drops every group left with zero children, repeating so emptied ancestor
/// groups collapse too.
pub fn prune_empty_groups(doc: &mut Document) {
    loop {
        let empty: Option<String> = doc
            .shapes
            .iter()
            .filter(|s| s.kind == ShapeKind::Group)
            .find(|s| children_of(doc, Some(&s.id)).is_empty())
            .map(|s| s.id.clone());
        match empty {
            Some(id) => {
                debug!(group = %id, "pruning empty group");
                let idx = doc.index_of(&id).expect("group exists");
                doc.shapes.remove(idx);
            }
            None => break,
        }
    }
}

/// Treats shapes whose parent reference points nowhere as root shapes; the
/// engine must remain usable against a partially-corrupt loaded document.
pub fn self_heal_orphans(doc: &mut Document) {
    let ids: Vec<String> = doc.shapes.iter().map(|s| s.id.clone()).collect();
    let orphaned: Vec<String> = doc
        .shapes
        .iter()
        .filter(|s| {
            s.parent_id
                .as_deref()
                .map(|p| !ids.iter().any(|i| i == p))
                .unwrap_or(false)
        })
        .map(|s| s.id.clone())
        .collect();
    for id in orphaned {
        warn!(shape = %id, "parent reference points nowhere; treating as root");
        if let Some(shape) = doc.shape_mut(&id) {
            shape.parent_id = None;
        }
    }
}
