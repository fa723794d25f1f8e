//! Stateless per-shape geometry: bounding boxes, content dimensions, and
//! point containment for hit-testing.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::document::{PathPoint, Shape, ShapeKind};

/// Hit tolerance never drops below this, so zero-width strokes stay pickable.
pub const MIN_HIT_TOLERANCE: f32 = 3.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoundingBox {
    pub fn from_center(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            left: center.x - width / 2.0,
            top: center.y - height / 2.0,
            right: center.x + width / 2.0,
            bottom: center.y + height / 2.0,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Content width/height of a shape, independent of rotation.
///
/// Polygon kinds prefer the real point-set box when points exist, falling
/// back to a radius-derived square. Text without explicit size uses a
/// character-count × font-size heuristic.
pub fn dimensions(shape: &Shape) -> (f32, f32) {
    match shape.kind {
        ShapeKind::Frame | ShapeKind::Group | ShapeKind::Rectangle => (
            shape.width.unwrap_or(0.0),
            shape.height.unwrap_or(0.0),
        ),
        ShapeKind::Circle => {
            let r = shape.radius.unwrap_or(0.0);
            (r * 2.0, r * 2.0)
        }
        ShapeKind::Ellipse => (
            shape.radius_x.unwrap_or(0.0) * 2.0,
            shape.radius_y.unwrap_or(0.0) * 2.0,
        ),
        ShapeKind::Polygon | ShapeKind::RoundedPolygon => {
            if let Some(b) = points_box(&shape.points) {
                (b.width(), b.height())
            } else {
                let r = shape.radius.unwrap_or(0.0);
                (r * 2.0, r * 2.0)
            }
        }
        ShapeKind::Line | ShapeKind::Path => points_box(&shape.points)
            .map(|b| (b.width(), b.height()))
            .unwrap_or((0.0, 0.0)),
        ShapeKind::Text => text_box(shape),
    }
}

/// Axis-aligned bounding box of a shape, or `None` for degenerate geometry.
pub fn bounding_box(shape: &Shape) -> Option<BoundingBox> {
    let center = Vec2::new(shape.x, shape.y);
    match shape.kind {
        ShapeKind::Frame | ShapeKind::Group | ShapeKind::Rectangle | ShapeKind::Text => {
            let (w, h) = dimensions(shape);
            if w <= 0.0 || h <= 0.0 {
                return None;
            }
            Some(BoundingBox::from_center(center, w, h))
        }
        ShapeKind::Circle | ShapeKind::Ellipse => {
            let (w, h) = dimensions(shape);
            if w <= 0.0 || h <= 0.0 {
                return None;
            }
            Some(BoundingBox::from_center(center, w, h))
        }
        ShapeKind::Polygon | ShapeKind::RoundedPolygon => {
            if let Some(b) = points_box(&shape.points) {
                Some(b)
            } else {
                let r = shape.radius.unwrap_or(0.0);
                if r <= 0.0 {
                    return None;
                }
                Some(BoundingBox::from_center(center, r * 2.0, r * 2.0))
            }
        }
        ShapeKind::Line | ShapeKind::Path => points_box(&shape.points),
    }
}

/// Smallest box enclosing every given box; `None` for an empty input.
pub fn union_bounding_box<I>(boxes: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = BoundingBox>,
{
    boxes.into_iter().reduce(|a, b| a.union(&b))
}

/// Point containment test for hit-testing. Zero-size shapes are never hit.
pub fn point_in_shape(shape: &Shape, point: Vec2) -> bool {
    let center = Vec2::new(shape.x, shape.y);
    // Rect-family and ellipse tests run in shape-local axis-aligned space.
    let local = rotate_around(point, center, -shape.rotation.to_radians());

    match shape.kind {
        ShapeKind::Frame | ShapeKind::Group | ShapeKind::Rectangle | ShapeKind::Text => {
            let (w, h) = dimensions(shape);
            if w <= 0.0 || h <= 0.0 {
                return false;
            }
            BoundingBox::from_center(center, w, h).contains(local)
        }
        ShapeKind::Circle => {
            let r = shape.radius.unwrap_or(0.0);
            r > 0.0 && (point - center).length_squared() <= r * r
        }
        ShapeKind::Ellipse => {
            let rx = shape.radius_x.unwrap_or(0.0);
            let ry = shape.radius_y.unwrap_or(0.0);
            if rx <= 0.0 || ry <= 0.0 {
                return false;
            }
            let d = local - center;
            (d.x * d.x) / (rx * rx) + (d.y * d.y) / (ry * ry) <= 1.0
        }
        ShapeKind::Polygon | ShapeKind::RoundedPolygon => {
            if shape.points.len() >= 3 {
                point_in_polygon(&shape.points, point)
            } else {
                let r = shape.radius.unwrap_or(0.0);
                r > 0.0 && (point - center).length_squared() <= r * r
            }
        }
        ShapeKind::Line | ShapeKind::Path => {
            let tolerance = hit_tolerance(shape);
            if near_outline(&shape.points, shape.closed, point, tolerance) {
                return true;
            }
            shape.closed && shape.points.len() >= 3 && point_in_polygon(&shape.points, point)
        }
    }
}

/// Stroke-derived pick tolerance, floored so hairlines remain selectable.
pub fn hit_tolerance(shape: &Shape) -> f32 {
    (shape.stroke_width / 2.0).max(MIN_HIT_TOLERANCE)
}

/// Distance from a point to a line segment.
pub fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

fn near_outline(points: &[PathPoint], closed: bool, point: Vec2, tolerance: f32) -> bool {
    if points.is_empty() {
        return false;
    }
    if points.len() == 1 {
        return (point - points[0].anchor()).length() <= tolerance;
    }
    let n = points.len();
    let last = if closed { n } else { n - 1 };
    for i in 0..last {
        let a = points[i].anchor();
        let b = points[(i + 1) % n].anchor();
        if distance_to_segment(point, a, b) <= tolerance {
            return true;
        }
    }
    false
}

/// Even-odd ray-cast containment against the anchor polygon.
fn point_in_polygon(points: &[PathPoint], p: Vec2) -> bool {
    let n = points.len();
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = points[i].anchor();
        let b = points[j].anchor();
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Extrema box over anchors and handles, so curve control geometry is
/// conservatively included.
fn points_box(points: &[PathPoint]) -> Option<BoundingBox> {
    let mut it = points.iter();
    let first = it.next()?;
    let mut b = BoundingBox {
        left: first.x,
        top: first.y,
        right: first.x,
        bottom: first.y,
    };
    let mut include = |p: Vec2| {
        b.left = b.left.min(p.x);
        b.top = b.top.min(p.y);
        b.right = b.right.max(p.x);
        b.bottom = b.bottom.max(p.y);
    };
    for h in [first.handle_left, first.handle_right].into_iter().flatten() {
        include(h);
    }
    for p in it {
        include(p.anchor());
        for h in [p.handle_left, p.handle_right].into_iter().flatten() {
            include(h);
        }
    }
    if b.width() <= 0.0 && b.height() <= 0.0 && points.len() < 2 {
        return None;
    }
    Some(b)
}

fn text_box(shape: &Shape) -> (f32, f32) {
    if let (Some(w), Some(h)) = (shape.width, shape.height) {
        return (w, h);
    }
    let chars = shape
        .content
        .as_deref()
        .map(|c| c.chars().count())
        .unwrap_or(0);
    (
        chars as f32 * shape.font_size * 0.6,
        shape.font_size * 1.2,
    )
}

fn rotate_around(p: Vec2, center: Vec2, radians: f32) -> Vec2 {
    if radians == 0.0 {
        return p;
    }
    let (sin, cos) = radians.sin_cos();
    let d = p - center;
    center + Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
}
