//! Document and geometry engine for a vector design canvas: an ordered
//! scene graph with auto-layout, bezier path editing, gradient paints,
//! snapshot-based undo/redo, and a gesture-driven edit lifecycle.

pub mod document;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod gradient;
pub mod history;
pub mod layout;
pub mod path;
pub mod scene;

pub use document::{
    AutoLayout, Axis, Color, CrossAlign, Document, Gradient, GradientHandles, GradientKind,
    GradientStop, LayoutFlow, MainAlign, Page, PathPoint, PointKind, Shape, ShapeKind, SizingMode,
    Style, StyleKind,
};
pub use engine::{Ack, AlignMode, Engine, PaintDescriptor, PropertyRequest, RenderShape, SelectionInfo};
pub use error::EngineError;
pub use gesture::GradientEnd;
pub use path::{HandleSide, InsertOutcome};
