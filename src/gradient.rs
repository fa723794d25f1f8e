//! Gradient normalization, stop interpolation, handle math, and the bounded
//! raster cache for the two paint topologies native gradient primitives
//! cannot express (angular and diamond).

use std::f32::consts::TAU;
use std::num::NonZeroUsize;
use std::sync::Arc;

use glam::Vec2;
use lru::LruCache;
use tracing::trace;

use crate::document::{Color, Gradient, GradientKind, GradientStop};

/// Entry cap for the angular/diamond raster cache.
pub const RASTER_CACHE_CAP: usize = 32;

/// Normalizes a partial gradient description into canonical form: stops
/// clamped to [0,1] and sorted ascending, a lone stop mirrored to both ends,
/// and the angle rederived from the handles. Already-normalized input is a
/// fixed point.
pub fn normalize(gradient: &Gradient) -> Gradient {
    let mut out = gradient.clone();
    for stop in &mut out.stops {
        stop.position = stop.position.clamp(0.0, 1.0);
        stop.opacity = stop.opacity.clamp(0.0, 1.0);
    }
    out.stops
        .sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap_or(std::cmp::Ordering::Equal));
    if out.stops.len() == 1 {
        let lone = out.stops[0];
        out.stops = vec![
            GradientStop { position: 0.0, ..lone },
            GradientStop { position: 1.0, ..lone },
        ];
    }
    out.angle = handle_angle(&out);
    out
}

/// Angle in degrees of the start→end axis, measured clockwise from +x.
fn handle_angle(gradient: &Gradient) -> f32 {
    let axis = gradient.handles.end - gradient.handles.start;
    if axis.length_squared() <= f32::EPSILON {
        return gradient.angle;
    }
    axis.y.atan2(axis.x).to_degrees()
}

/// Flat-color fallback for a malformed gradient with fewer than 2 stops.
pub fn fallback_color(gradient: &Gradient) -> (Color, f32) {
    gradient
        .stops
        .first()
        .map(|s| (s.color, s.opacity))
        .unwrap_or((Color::BLACK, 1.0))
}

/// Samples color and opacity at `ratio` by piecewise-linear interpolation
/// between the bracketing stops, clamped to the nearest endpoint outside
/// [0,1]. Fewer than 2 stops degrades to the flat-color fallback.
pub fn sample(gradient: &Gradient, ratio: f32) -> (Color, f32) {
    if gradient.stops.len() < 2 {
        return fallback_color(gradient);
    }
    let ratio = ratio.clamp(0.0, 1.0);
    let stops = &gradient.stops;
    if ratio <= stops[0].position {
        return (stops[0].color, stops[0].opacity);
    }
    for pair in stops.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if ratio <= b.position {
            let span = b.position - a.position;
            let t = if span <= f32::EPSILON {
                0.0
            } else {
                (ratio - a.position) / span
            };
            return (a.color.lerp(&b.color, t), a.opacity + (b.opacity - a.opacity) * t);
        }
    }
    let last = stops.last().expect("at least two stops");
    (last.color, last.opacity)
}

/// Converts a normalized handle position to shape-local coordinates centered
/// on the shape's geometric center, scaled by its content dimensions.
pub fn handle_to_local(handle: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new((handle.x - 0.5) * width, (handle.y - 0.5) * height)
}

/// Inverse of [`handle_to_local`]; degenerate dimensions map to the center.
pub fn local_to_handle(local: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        if width.abs() <= f32::EPSILON { 0.5 } else { local.x / width + 0.5 },
        if height.abs() <= f32::EPSILON { 0.5 } else { local.y / height + 0.5 },
    )
}

/// Maps a point to a sampling ratio for the given topology, with `start` and
/// `end` in the same coordinate space as `point`.
pub fn ratio_for_point(kind: GradientKind, point: Vec2, start: Vec2, end: Vec2) -> f32 {
    let axis = end - start;
    let len_sq = axis.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    let d = point - start;
    match kind {
        // Projection onto the start→end axis.
        GradientKind::Linear => d.dot(axis) / len_sq,
        // Distance from start over axis length.
        GradientKind::Radial => d.length() / len_sq.sqrt(),
        // Angle from the axis direction, wrapped to [0,1) over a full turn.
        GradientKind::Angular => {
            let theta = d.y.atan2(d.x) - axis.y.atan2(axis.x);
            theta.rem_euclid(TAU) / TAU
        }
        // Taxicab distance in the axis/perpendicular basis.
        GradientKind::Diamond => {
            let len = len_sq.sqrt();
            let u = d.dot(axis) / len_sq;
            let v = d.dot(Vec2::new(-axis.y, axis.x) / len) / len;
            u.abs() + v.abs()
        }
    }
}

/// True when the topology needs pixel-buffer rasterization because native
/// paint primitives cannot express it.
pub fn needs_raster(kind: GradientKind) -> bool {
    matches!(kind, GradientKind::Angular | GradientKind::Diamond)
}

/// An RGBA8 row-major pixel buffer for one rasterized gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RasterKey {
    width: u32,
    height: u32,
    descriptor: String,
}

/// Memoizes angular/diamond pixel buffers keyed by shape dimensions plus the
/// gradient descriptor, evicting the oldest entry past the size cap.
pub struct Rasterizer {
    cache: LruCache<RasterKey, RasterBuffer>,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(RASTER_CACHE_CAP).expect("nonzero cap")),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns the cached buffer for this (dimensions, gradient) pair,
    /// rasterizing on a miss.
    pub fn raster(&mut self, gradient: &Gradient, width: u32, height: u32) -> RasterBuffer {
        let key = RasterKey {
            width,
            height,
            descriptor: serde_json::to_string(gradient).unwrap_or_default(),
        };
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        trace!(width, height, kind = ?gradient.kind, "rasterizing gradient");
        let buffer = rasterize(gradient, width, height);
        self.cache.put(key, buffer.clone());
        buffer
    }
}

fn rasterize(gradient: &Gradient, width: u32, height: u32) -> RasterBuffer {
    let normalized = normalize(gradient);
    let w = width.max(1);
    let h = height.max(1);
    let start = Vec2::new(
        normalized.handles.start.x * w as f32,
        normalized.handles.start.y * h as f32,
    );
    let end = Vec2::new(
        normalized.handles.end.x * w as f32,
        normalized.handles.end.y * h as f32,
    );

    let mut pixels = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let ratio = ratio_for_point(normalized.kind, p, start, end);
            let (color, opacity) = sample(&normalized, ratio);
            pixels.push((color.r.clamp(0.0, 1.0) * 255.0).round() as u8);
            pixels.push((color.g.clamp(0.0, 1.0) * 255.0).round() as u8);
            pixels.push((color.b.clamp(0.0, 1.0) * 255.0).round() as u8);
            pixels.push(((color.a * opacity).clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }
    RasterBuffer {
        width: w,
        height: h,
        pixels: Arc::new(pixels),
    }
}
