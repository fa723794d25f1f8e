use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric tolerance used by the no-op guard and the material-change diff.
pub const EPSILON: f32 = 1e-4;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "default_one")]
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    pub fn approx_eq(&self, other: &Color, eps: f32) -> bool {
        (self.r - other.r).abs() <= eps
            && (self.g - other.g).abs() <= eps
            && (self.b - other.b).abs() <= eps
            && (self.a - other.a).abs() <= eps
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Angular,
    Diamond,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub position: f32,
    pub color: Color,
    #[serde(default = "default_one")]
    pub opacity: f32,
}

/// Gradient endpoints in normalized [0,1]² shape-local space.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GradientHandles {
    pub start: Vec2,
    pub end: Vec2,
}

impl Default for GradientHandles {
    fn default() -> Self {
        Self {
            start: Vec2::new(0.5, 0.0),
            end: Vec2::new(0.5, 1.0),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Gradient {
    #[serde(default)]
    pub kind: GradientKind,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub handles: GradientHandles,
    #[serde(default)]
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StyleKind {
    #[default]
    Solid,
    Gradient,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Style {
    #[serde(default)]
    pub kind: StyleKind,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub gradient: Option<Gradient>,
}

impl Style {
    pub fn solid(color: Color) -> Self {
        Self {
            kind: StyleKind::Solid,
            color,
            gradient: None,
        }
    }

    pub fn gradient(gradient: Gradient) -> Self {
        Self {
            kind: StyleKind::Gradient,
            color: Color::BLACK,
            gradient: Some(gradient),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    #[default]
    Corner,
    Smooth,
    Disconnected,
}

/// One anchor of a path. Handles are absolute coordinates, not offsets.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub kind: PointKind,
    #[serde(default)]
    pub handle_left: Option<Vec2>,
    #[serde(default)]
    pub handle_right: Option<Vec2>,
}

impl PathPoint {
    pub fn corner(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            kind: PointKind::Corner,
            handle_left: None,
            handle_right: None,
        }
    }

    pub fn anchor(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set_anchor(&mut self, p: Vec2) {
        self.x = p.x;
        self.y = p.y;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ShapeKind {
    Frame,
    Group,
    Rectangle,
    Circle,
    Ellipse,
    Polygon,
    RoundedPolygon,
    Line,
    Path,
    Text,
}

impl ShapeKind {
    pub fn is_container(&self) -> bool {
        matches!(self, ShapeKind::Frame | ShapeKind::Group)
    }

    pub fn default_name(&self) -> &'static str {
        match self {
            ShapeKind::Frame => "Frame",
            ShapeKind::Group => "Group",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Ellipse => "Ellipse",
            ShapeKind::Polygon => "Polygon",
            ShapeKind::RoundedPolygon => "Rounded Polygon",
            ShapeKind::Line => "Line",
            ShapeKind::Path => "Path",
            ShapeKind::Text => "Text",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutFlow {
    #[default]
    Stack,
    Grid,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    #[default]
    Vertical,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum MainAlign {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CrossAlign {
    #[default]
    Start,
    Center,
    End,
    Stretch,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizingMode {
    #[default]
    Fixed,
    Hug,
    Fill,
}

/// Layout configuration carried by container shapes with `layout = auto`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct AutoLayout {
    #[serde(default)]
    pub flow: LayoutFlow,
    #[serde(default)]
    pub axis: Axis,
    #[serde(default)]
    pub spacing: f32,
    #[serde(default = "default_padding")]
    pub padding: f32,
    #[serde(default)]
    pub main_align: MainAlign,
    #[serde(default)]
    pub cross_align: CrossAlign,
    #[serde(default)]
    pub width_mode: SizingMode,
    #[serde(default)]
    pub height_mode: SizingMode,
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub columns: Option<usize>,
    #[serde(default)]
    pub cell_width_mode: SizingMode,
    #[serde(default)]
    pub cell_height_mode: SizingMode,
    #[serde(default)]
    pub cell_width: f32,
    #[serde(default)]
    pub cell_height: f32,
}

impl Default for AutoLayout {
    fn default() -> Self {
        Self {
            flow: LayoutFlow::Stack,
            axis: Axis::Vertical,
            spacing: 0.0,
            padding: default_padding(),
            main_align: MainAlign::Start,
            cross_align: CrossAlign::Start,
            width_mode: SizingMode::Fixed,
            height_mode: SizingMode::Fixed,
            rows: None,
            columns: None,
            cell_width_mode: SizingMode::Fixed,
            cell_height_mode: SizingMode::Fixed,
            cell_width: 0.0,
            cell_height: 0.0,
        }
    }
}

/// One entity in the scene graph. A flat struct with kind-specific optional
/// geometry, mirroring how the serialized form carries shapes.
///
/// `x`/`y` are the shape's center. Path and line points are absolute
/// document coordinates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: String,
    pub kind: ShapeKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_one")]
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    /// Fill styles, top-most first.
    #[serde(default)]
    pub fills: Vec<Style>,
    /// Stroke styles, top-most first.
    #[serde(default)]
    pub strokes: Vec<Style>,
    #[serde(default = "default_one")]
    pub stroke_width: f32,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: f32,

    // Kind-specific geometry
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub radius_x: Option<f32>,
    #[serde(default)]
    pub radius_y: Option<f32>,
    #[serde(default)]
    pub sides: Option<u32>,
    #[serde(default)]
    pub corner_radius: f32,
    /// Arc cut-out on circle/ellipse, degrees.
    #[serde(default)]
    pub arc_start: f32,
    #[serde(default = "default_sweep")]
    pub arc_sweep: f32,
    #[serde(default)]
    pub inner_radius_ratio: f32,
    #[serde(default)]
    pub points: Vec<PathPoint>,
    #[serde(default)]
    pub closed: bool,
    /// Pre-rounding anchors; corner rounding is always recomputed from these.
    #[serde(default)]
    pub base_points: Option<Vec<PathPoint>>,
    /// Retained original shape after a shape→path conversion. Dropped once a
    /// point is structurally edited, making the path permanent.
    #[serde(default)]
    pub path_source: Option<Box<Shape>>,

    // Text
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "default_font_size")]
    pub font_size: f32,

    // Layout participation
    #[serde(default = "default_true")]
    pub auto_positioned: bool,
    #[serde(default)]
    pub layout: Option<AutoLayout>,
    #[serde(default)]
    pub clips_content: bool,
}

impl Shape {
    /// Constructs a shape of `kind` with that kind's default geometry.
    pub fn new(kind: ShapeKind, id: String, name: String) -> Self {
        let mut shape = Self {
            id,
            kind,
            name,
            parent_id: None,
            page_id: None,
            visible: true,
            locked: false,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            fills: vec![Style::solid(Color::new(0.85, 0.85, 0.85, 1.0))],
            strokes: Vec::new(),
            stroke_width: 1.0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            width: None,
            height: None,
            radius: None,
            radius_x: None,
            radius_y: None,
            sides: None,
            corner_radius: 0.0,
            arc_start: 0.0,
            arc_sweep: default_sweep(),
            inner_radius_ratio: 0.0,
            points: Vec::new(),
            closed: false,
            base_points: None,
            path_source: None,
            content: None,
            font_size: default_font_size(),
            auto_positioned: true,
            layout: None,
            clips_content: false,
        };
        match kind {
            ShapeKind::Frame => {
                shape.width = Some(200.0);
                shape.height = Some(200.0);
                shape.fills = vec![Style::solid(Color::WHITE)];
                shape.clips_content = true;
            }
            ShapeKind::Group => {
                shape.width = Some(0.0);
                shape.height = Some(0.0);
                shape.fills = Vec::new();
            }
            ShapeKind::Rectangle => {
                shape.width = Some(100.0);
                shape.height = Some(100.0);
            }
            ShapeKind::Circle => {
                shape.radius = Some(50.0);
            }
            ShapeKind::Ellipse => {
                shape.radius_x = Some(60.0);
                shape.radius_y = Some(40.0);
            }
            ShapeKind::Polygon | ShapeKind::RoundedPolygon => {
                shape.radius = Some(50.0);
                shape.sides = Some(3);
                if kind == ShapeKind::RoundedPolygon {
                    shape.corner_radius = 8.0;
                }
            }
            ShapeKind::Line => {
                shape.fills = Vec::new();
                shape.strokes = vec![Style::solid(Color::BLACK)];
            }
            ShapeKind::Path => {
                shape.fills = Vec::new();
                shape.strokes = vec![Style::solid(Color::BLACK)];
            }
            ShapeKind::Text => {
                shape.content = Some(String::new());
                shape.fills = vec![Style::solid(Color::BLACK)];
            }
        }
        shape
    }

    pub fn is_container(&self) -> bool {
        self.kind.is_container()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: u64,
}

/// The whole serializable document: the ordered shape list (paint order =
/// list order, later = on top), the page list, and the active page.
///
/// Default-naming counters are owned by the document rather than any
/// process-wide state, and are rebuilt by scanning names on load.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub active_page_id: String,
    #[serde(skip)]
    pub name_counters: HashMap<ShapeKind, u32>,
    #[serde(skip)]
    pub id_counter: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let page = Page {
            id: "page-1".to_string(),
            name: "Page 1".to_string(),
            created_at: 0,
        };
        Self {
            shapes: Vec::new(),
            pages: vec![page],
            active_page_id: "page-1".to_string(),
            name_counters: HashMap::new(),
            id_counter: 0,
        }
    }

    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id == id)
    }

    pub fn shape_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|s| s.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.shapes.iter().position(|s| s.id == id)
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// The page a shape belongs to, defaulting to the active page.
    pub fn resolved_page_id<'a>(&'a self, shape: &'a Shape) -> &'a str {
        shape.page_id.as_deref().unwrap_or(&self.active_page_id)
    }

    pub fn next_shape_id(&mut self) -> String {
        self.id_counter += 1;
        format!("shape-{}", self.id_counter)
    }

    pub fn next_page_id(&mut self) -> String {
        self.id_counter += 1;
        format!("page-{}", self.id_counter)
    }

    pub fn next_default_name(&mut self, kind: ShapeKind) -> String {
        let counter = self.name_counters.entry(kind).or_insert(0);
        *counter += 1;
        format!("{} {}", kind.default_name(), counter)
    }

    /// Rebuilds id and naming counters by scanning the loaded document, so a
    /// freshly deserialized document never reuses an id or default name.
    pub fn rebuild_counters(&mut self) {
        let mut max_id = 0u64;
        for s in &self.shapes {
            if let Some(n) = s.id.strip_prefix("shape-").and_then(|n| n.parse::<u64>().ok()) {
                max_id = max_id.max(n);
            }
            for (kind, prefix) in ALL_KINDS {
                if let Some(rest) = s.name.strip_prefix(prefix) {
                    if let Ok(n) = rest.trim().parse::<u32>() {
                        let counter = self.name_counters.entry(*kind).or_insert(0);
                        *counter = (*counter).max(n);
                    }
                }
            }
        }
        for p in &self.pages {
            if let Some(n) = p.id.strip_prefix("page-").and_then(|n| n.parse::<u64>().ok()) {
                max_id = max_id.max(n);
            }
        }
        self.id_counter = self.id_counter.max(max_id);
    }

    /// Numeric-tolerant document equality, used by the no-op guard and the
    /// gesture-commit material-change diff.
    pub fn approx_eq(&self, other: &Document, eps: f32) -> bool {
        if self.active_page_id != other.active_page_id
            || self.pages != other.pages
            || self.shapes.len() != other.shapes.len()
        {
            return false;
        }
        self.shapes
            .iter()
            .zip(other.shapes.iter())
            .all(|(a, b)| shape_approx_eq(a, b, eps))
    }
}

const ALL_KINDS: &[(ShapeKind, &str)] = &[
    (ShapeKind::Frame, "Frame "),
    (ShapeKind::Group, "Group "),
    (ShapeKind::Rectangle, "Rectangle "),
    (ShapeKind::Circle, "Circle "),
    (ShapeKind::Ellipse, "Ellipse "),
    (ShapeKind::Polygon, "Polygon "),
    (ShapeKind::RoundedPolygon, "Rounded Polygon "),
    (ShapeKind::Line, "Line "),
    (ShapeKind::Path, "Path "),
    (ShapeKind::Text, "Text "),
];

fn f32_opt_approx_eq(a: Option<f32>, b: Option<f32>, eps: f32) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= eps,
        (None, None) => true,
        _ => false,
    }
}

fn vec2_opt_approx_eq(a: Option<Vec2>, b: Option<Vec2>, eps: f32) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs().max_element() <= eps,
        (None, None) => true,
        _ => false,
    }
}

fn points_approx_eq(a: &[PathPoint], b: &[PathPoint], eps: f32) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(p, q)| {
            p.kind == q.kind
                && (p.x - q.x).abs() <= eps
                && (p.y - q.y).abs() <= eps
                && vec2_opt_approx_eq(p.handle_left, q.handle_left, eps)
                && vec2_opt_approx_eq(p.handle_right, q.handle_right, eps)
        })
}

fn styles_approx_eq(a: &[Style], b: &[Style], eps: f32) -> bool {
    a.len() == b.len()
        && a.iter().zip(b.iter()).all(|(s, t)| {
            s.kind == t.kind
                && s.color.approx_eq(&t.color, eps)
                && match (&s.gradient, &t.gradient) {
                    (Some(g), Some(h)) => gradient_approx_eq(g, h, eps),
                    (None, None) => true,
                    _ => false,
                }
        })
}

fn gradient_approx_eq(a: &Gradient, b: &Gradient, eps: f32) -> bool {
    a.kind == b.kind
        && (a.angle - b.angle).abs() <= eps
        && (a.handles.start - b.handles.start).abs().max_element() <= eps
        && (a.handles.end - b.handles.end).abs().max_element() <= eps
        && a.stops.len() == b.stops.len()
        && a.stops.iter().zip(b.stops.iter()).all(|(s, t)| {
            (s.position - t.position).abs() <= eps
                && s.color.approx_eq(&t.color, eps)
                && (s.opacity - t.opacity).abs() <= eps
        })
}

pub(crate) fn shape_approx_eq(a: &Shape, b: &Shape, eps: f32) -> bool {
    a.id == b.id
        && a.kind == b.kind
        && a.name == b.name
        && a.parent_id == b.parent_id
        && a.page_id == b.page_id
        && a.visible == b.visible
        && a.locked == b.locked
        && a.blend_mode == b.blend_mode
        && a.sides == b.sides
        && a.closed == b.closed
        && a.content == b.content
        && a.auto_positioned == b.auto_positioned
        && a.layout == b.layout
        && a.clips_content == b.clips_content
        && (a.opacity - b.opacity).abs() <= eps
        && (a.stroke_width - b.stroke_width).abs() <= eps
        && (a.x - b.x).abs() <= eps
        && (a.y - b.y).abs() <= eps
        && (a.rotation - b.rotation).abs() <= eps
        && (a.corner_radius - b.corner_radius).abs() <= eps
        && (a.arc_start - b.arc_start).abs() <= eps
        && (a.arc_sweep - b.arc_sweep).abs() <= eps
        && (a.inner_radius_ratio - b.inner_radius_ratio).abs() <= eps
        && (a.font_size - b.font_size).abs() <= eps
        && f32_opt_approx_eq(a.width, b.width, eps)
        && f32_opt_approx_eq(a.height, b.height, eps)
        && f32_opt_approx_eq(a.radius, b.radius, eps)
        && f32_opt_approx_eq(a.radius_x, b.radius_x, eps)
        && f32_opt_approx_eq(a.radius_y, b.radius_y, eps)
        && points_approx_eq(&a.points, &b.points, eps)
        && match (&a.base_points, &b.base_points) {
            (Some(p), Some(q)) => points_approx_eq(p, q, eps),
            (None, None) => true,
            _ => false,
        }
        && styles_approx_eq(&a.fills, &b.fills, eps)
        && styles_approx_eq(&a.strokes, &b.strokes, eps)
}

fn default_true() -> bool {
    true
}

fn default_one() -> f32 {
    1.0
}

fn default_padding() -> f32 {
    12.0
}

fn default_sweep() -> f32 {
    360.0
}

fn default_font_size() -> f32 {
    16.0
}
