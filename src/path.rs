//! Bezier path editing: the point+handle model, smooth-handle symmetry,
//! corner rounding, segment insertion, and shape→path conversion.

use glam::Vec2;
use kurbo::{CubicBez, Line, ParamCurve, ParamCurveNearest, Point};
use serde::{Deserialize, Serialize};

use crate::document::{PathPoint, PointKind, Shape, ShapeKind};

/// Cubic approximation factor for a quarter-circle arc.
pub const ARC_KAPPA: f32 = 0.552_284_75;

/// Below this effective radius a vertex is left unrounded.
const MIN_ROUND_RADIUS: f32 = 0.01;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Left,
    Right,
}

impl HandleSide {
    pub fn opposite(&self) -> HandleSide {
        match self {
            HandleSide::Left => HandleSide::Right,
            HandleSide::Right => HandleSide::Left,
        }
    }
}

/// Outcome of a pick-driven insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new point was inserted at this index.
    Inserted(usize),
    /// The pick landed on the first point; the path was closed instead.
    Closed,
    /// No segment was within tolerance.
    Missed,
}

/// Funnel for all structural point edits. Editing a converted path makes it
/// permanent: the retained original and the rounding base are discarded.
pub fn apply_points_transform<F>(shape: &mut Shape, f: F)
where
    F: FnOnce(&mut Vec<PathPoint>, &mut bool),
{
    f(&mut shape.points, &mut shape.closed);
    shape.path_source = None;
    shape.base_points = None;
}

/// Moves one handle of a point. For a smooth point without the
/// break-symmetry modifier, the opposite handle is recomputed antipodally at
/// equal distance so the anchor stays the midpoint of its handles.
pub fn move_handle(
    points: &mut [PathPoint],
    index: usize,
    side: HandleSide,
    position: Vec2,
    break_symmetry: bool,
) {
    let Some(point) = points.get_mut(index) else {
        return;
    };
    match side {
        HandleSide::Left => point.handle_left = Some(position),
        HandleSide::Right => point.handle_right = Some(position),
    }
    if break_symmetry {
        point.kind = PointKind::Disconnected;
        return;
    }
    if point.kind == PointKind::Smooth {
        let mirrored = point.anchor() * 2.0 - position;
        match side.opposite() {
            HandleSide::Left => point.handle_left = Some(mirrored),
            HandleSide::Right => point.handle_right = Some(mirrored),
        }
    }
}

/// Moves an anchor, carrying its handles along so curve shape is preserved.
pub fn move_anchor(points: &mut [PathPoint], index: usize, position: Vec2) {
    let Some(point) = points.get_mut(index) else {
        return;
    };
    let delta = position - point.anchor();
    point.set_anchor(position);
    if let Some(h) = point.handle_left.as_mut() {
        *h += delta;
    }
    if let Some(h) = point.handle_right.as_mut() {
        *h += delta;
    }
}

/// Changes a point's continuity type. Corner drops handles; smooth
/// synthesizes symmetric handles along the neighbor chord when none exist.
pub fn retype_point(points: &mut [PathPoint], index: usize, kind: PointKind) {
    let n = points.len();
    if index >= n {
        return;
    }
    match kind {
        PointKind::Corner => {
            let point = &mut points[index];
            point.kind = PointKind::Corner;
            point.handle_left = None;
            point.handle_right = None;
        }
        PointKind::Smooth => {
            let anchor = points[index].anchor();
            let prev = points[(index + n - 1) % n].anchor();
            let next = points[(index + 1) % n].anchor();
            let chord = next - prev;
            let dir = if chord.length_squared() > f32::EPSILON {
                chord.normalize()
            } else {
                Vec2::X
            };
            let len_prev = (anchor - prev).length() / 3.0;
            let len_next = (next - anchor).length() / 3.0;
            // Equal distances keep the anchor at the handle midpoint.
            let reach = ((len_prev + len_next) / 2.0).max(1.0);
            let point = &mut points[index];
            point.kind = PointKind::Smooth;
            point.handle_left = Some(anchor - dir * reach);
            point.handle_right = Some(anchor + dir * reach);
        }
        PointKind::Disconnected => {
            points[index].kind = PointKind::Disconnected;
        }
    }
}

pub fn delete_point(points: &mut Vec<PathPoint>, index: usize) {
    if index < points.len() {
        points.remove(index);
    }
}

/// Picks the nearest segment across the whole path and splits it, unless the
/// pick lands on the first point of a path with ≥2 points, which closes the
/// path instead.
pub fn insert_point(
    points: &mut Vec<PathPoint>,
    closed: &mut bool,
    pick: Vec2,
    tolerance: f32,
) -> InsertOutcome {
    if points.len() >= 2 && !*closed && (pick - points[0].anchor()).length() <= tolerance {
        *closed = true;
        return InsertOutcome::Closed;
    }
    let n = points.len();
    if n < 2 {
        return InsertOutcome::Missed;
    }
    let segment_count = if *closed { n } else { n - 1 };

    let mut best: Option<(usize, f64, f32)> = None;
    for i in 0..segment_count {
        let j = (i + 1) % n;
        let (t, dist) = nearest_on_segment(&points[i], &points[j], pick);
        if best.map(|(_, _, d)| dist < d).unwrap_or(true) {
            best = Some((i, t, dist));
        }
    }
    let Some((i, t, dist)) = best else {
        return InsertOutcome::Missed;
    };
    if dist > tolerance {
        return InsertOutcome::Missed;
    }

    let j = (i + 1) % n;
    let new_point = split_segment(points, i, j, t);
    let insert_at = i + 1;
    points.insert(insert_at, new_point);
    InsertOutcome::Inserted(insert_at)
}

/// Replaces each vertex of a closed point list with a matched point pair
/// joined by an arc-equivalent cubic. The effective radius at a vertex is
/// clamped to half the length of its shorter adjacent edge, so repeated
/// application from the same base never exceeds the bound.
pub fn round_corners(base: &[PathPoint], radius: f32) -> Vec<PathPoint> {
    let n = base.len();
    if n < 3 || radius <= MIN_ROUND_RADIUS {
        return base.to_vec();
    }
    let mut out = Vec::with_capacity(n * 2);
    for i in 0..n {
        let vertex = base[i].anchor();
        let prev = base[(i + n - 1) % n].anchor();
        let next = base[(i + 1) % n].anchor();
        let to_prev = prev - vertex;
        let to_next = next - vertex;
        let len_prev = to_prev.length();
        let len_next = to_next.length();
        let effective = radius.min(len_prev / 2.0).min(len_next / 2.0);
        if effective <= MIN_ROUND_RADIUS || len_prev <= f32::EPSILON || len_next <= f32::EPSILON {
            out.push(base[i]);
            continue;
        }
        let entry = vertex + to_prev / len_prev * effective;
        let exit = vertex + to_next / len_next * effective;
        out.push(PathPoint {
            x: entry.x,
            y: entry.y,
            kind: PointKind::Disconnected,
            handle_left: None,
            handle_right: Some(entry + (vertex - entry) * ARC_KAPPA),
        });
        out.push(PathPoint {
            x: exit.x,
            y: exit.y,
            kind: PointKind::Disconnected,
            handle_left: Some(exit + (vertex - exit) * ARC_KAPPA),
            handle_right: None,
        });
    }
    out
}

/// Applies a corner radius to a path shape, always recomputing from the
/// stored pre-rounding base so repeated application never double-rounds.
pub fn set_corner_radius(shape: &mut Shape, radius: f32) {
    if shape.base_points.is_none() {
        shape.base_points = Some(shape.points.clone());
    }
    let base = shape.base_points.clone().expect("base points just stored");
    shape.points = round_corners(&base, radius);
    shape.corner_radius = radius;
}

/// Derives the explicit point list reproducing a shape's rendered
/// silhouette. Returns the points and whether the outline is closed.
pub fn silhouette_points(shape: &Shape) -> (Vec<PathPoint>, bool) {
    let center = Vec2::new(shape.x, shape.y);
    match shape.kind {
        ShapeKind::Rectangle | ShapeKind::Frame | ShapeKind::Group | ShapeKind::Text => {
            let (w, h) = crate::geometry::dimensions(shape);
            let corners = [
                Vec2::new(-w / 2.0, -h / 2.0),
                Vec2::new(w / 2.0, -h / 2.0),
                Vec2::new(w / 2.0, h / 2.0),
                Vec2::new(-w / 2.0, h / 2.0),
            ];
            let mut points: Vec<PathPoint> = corners
                .iter()
                .map(|c| PathPoint::corner(center.x + c.x, center.y + c.y))
                .collect();
            if shape.corner_radius > 0.0 {
                points = round_corners(&points, shape.corner_radius);
            }
            rotate_points(&mut points, center, shape.rotation.to_radians());
            (points, true)
        }
        ShapeKind::Circle => {
            let r = shape.radius.unwrap_or(0.0);
            (ellipse_points(center, r, r), true)
        }
        ShapeKind::Ellipse => {
            let rx = shape.radius_x.unwrap_or(0.0);
            let ry = shape.radius_y.unwrap_or(0.0);
            (ellipse_points(center, rx, ry), true)
        }
        ShapeKind::Polygon | ShapeKind::RoundedPolygon => {
            let vertices = polygon_vertices(
                center,
                shape.radius.unwrap_or(0.0),
                shape.sides.unwrap_or(3).max(3),
                shape.rotation,
            );
            let points: Vec<PathPoint> =
                vertices.iter().map(|v| PathPoint::corner(v.x, v.y)).collect();
            if shape.kind == ShapeKind::RoundedPolygon && shape.corner_radius > 0.0 {
                (round_corners(&points, shape.corner_radius), true)
            } else {
                (points, true)
            }
        }
        ShapeKind::Line => (shape.points.clone(), false),
        ShapeKind::Path => (shape.points.clone(), shape.closed),
    }
}

/// Regular polygon vertices from radius/sides/rotation, first vertex at the
/// top.
pub fn polygon_vertices(center: Vec2, radius: f32, sides: u32, rotation_deg: f32) -> Vec<Vec2> {
    let sides = sides.max(3);
    let step = std::f32::consts::TAU / sides as f32;
    let start = -std::f32::consts::FRAC_PI_2 + rotation_deg.to_radians();
    (0..sides)
        .map(|i| {
            let a = start + step * i as f32;
            center + Vec2::new(a.cos(), a.sin()) * radius
        })
        .collect()
}

/// Converts any non-path shape into an equivalent editable path, retaining
/// the original for a lossless revert while no point has been edited.
pub fn convert_to_path(shape: &Shape) -> Shape {
    if shape.kind == ShapeKind::Path {
        return shape.clone();
    }
    let (points, closed) = silhouette_points(shape);
    let mut path = shape.clone();
    path.kind = ShapeKind::Path;
    path.points = points;
    path.closed = closed;
    path.rotation = 0.0;
    // Pre-rounding base for kinds that rounded their silhouette.
    path.base_points = if shape.corner_radius > 0.0 {
        let mut unrounded = shape.clone();
        unrounded.corner_radius = 0.0;
        Some(silhouette_points(&unrounded).0)
    } else {
        None
    };
    path.path_source = Some(Box::new(shape.clone()));
    path
}

/// The retained original if the conversion is still lossless.
pub fn revert_conversion(shape: &Shape) -> Option<Shape> {
    shape.path_source.as_deref().cloned()
}

fn ellipse_points(center: Vec2, rx: f32, ry: f32) -> Vec<PathPoint> {
    let kx = rx * ARC_KAPPA;
    let ky = ry * ARC_KAPPA;
    let anchors = [
        (Vec2::new(0.0, -ry), Vec2::new(-kx, 0.0), Vec2::new(kx, 0.0)),
        (Vec2::new(rx, 0.0), Vec2::new(0.0, -ky), Vec2::new(0.0, ky)),
        (Vec2::new(0.0, ry), Vec2::new(kx, 0.0), Vec2::new(-kx, 0.0)),
        (Vec2::new(-rx, 0.0), Vec2::new(0.0, ky), Vec2::new(0.0, -ky)),
    ];
    anchors
        .iter()
        .map(|(a, hl, hr)| {
            let anchor = center + *a;
            PathPoint {
                x: anchor.x,
                y: anchor.y,
                kind: PointKind::Smooth,
                handle_left: Some(anchor + *hl),
                handle_right: Some(anchor + *hr),
            }
        })
        .collect()
}

fn rotate_points(points: &mut [PathPoint], center: Vec2, radians: f32) {
    if radians == 0.0 {
        return;
    }
    let (sin, cos) = radians.sin_cos();
    let rotate = |p: Vec2| -> Vec2 {
        let d = p - center;
        center + Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
    };
    for p in points.iter_mut() {
        let a = rotate(p.anchor());
        p.set_anchor(a);
        p.handle_left = p.handle_left.map(rotate);
        p.handle_right = p.handle_right.map(rotate);
    }
}

fn to_kurbo(v: Vec2) -> Point {
    Point::new(v.x as f64, v.y as f64)
}

fn from_kurbo(p: Point) -> Vec2 {
    Vec2::new(p.x as f32, p.y as f32)
}

fn segment_is_curved(a: &PathPoint, b: &PathPoint) -> bool {
    a.handle_right.is_some() || b.handle_left.is_some()
}

fn segment_cubic(a: &PathPoint, b: &PathPoint) -> CubicBez {
    CubicBez::new(
        to_kurbo(a.anchor()),
        to_kurbo(a.handle_right.unwrap_or_else(|| a.anchor())),
        to_kurbo(b.handle_left.unwrap_or_else(|| b.anchor())),
        to_kurbo(b.anchor()),
    )
}

/// Nearest parameter and distance on one segment.
fn nearest_on_segment(a: &PathPoint, b: &PathPoint, pick: Vec2) -> (f64, f32) {
    let p = to_kurbo(pick);
    if segment_is_curved(a, b) {
        let nearest = segment_cubic(a, b).nearest(p, 1e-6);
        (nearest.t, (nearest.distance_sq as f32).sqrt())
    } else {
        let nearest = Line::new(to_kurbo(a.anchor()), to_kurbo(b.anchor())).nearest(p, 1e-6);
        (nearest.t, (nearest.distance_sq as f32).sqrt())
    }
}

/// Splits the segment i→j at parameter `t`, rewriting the neighbor handles
/// so the curve is unchanged, and returns the new point.
fn split_segment(points: &mut [PathPoint], i: usize, j: usize, t: f64) -> PathPoint {
    if segment_is_curved(&points[i], &points[j]) {
        let cubic = segment_cubic(&points[i], &points[j]);
        let head = cubic.subsegment(0.0..t);
        let tail = cubic.subsegment(t..1.0);
        points[i].handle_right = Some(from_kurbo(head.p1));
        points[j].handle_left = Some(from_kurbo(tail.p2));
        let anchor = from_kurbo(head.p3);
        PathPoint {
            x: anchor.x,
            y: anchor.y,
            kind: PointKind::Smooth,
            handle_left: Some(from_kurbo(head.p2)),
            handle_right: Some(from_kurbo(tail.p1)),
        }
    } else {
        let a = points[i].anchor();
        let b = points[j].anchor();
        let anchor = a + (b - a) * t as f32;
        PathPoint::corner(anchor.x, anchor.y)
    }
}
