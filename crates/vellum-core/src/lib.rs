//! Vellum Core Library
//!
//! Platform-agnostic element model, geometry and camera logic for the
//! Vellum design canvas.

pub mod command;
pub mod element;
pub mod error;
pub mod geometry;
pub mod patch;
pub mod store;
pub mod viewport;

pub use command::{CommandQueue, Priority, RenderCommand};
pub use element::{
    CircleElement, Element, ElementCommon, ElementId, ElementTransform, ElementType, FontWeight,
    GroupElement, ImageAdjustments, ImageElement, ImageFormat, RectElement, ResolvedSpanStyle,
    RichTextSpan, SerializableColor, ShapeStyle, SpanStyle, TextAlign, TextDecoration,
    TextElement, TextStyle, TriangleElement,
};
pub use error::ElementError;
pub use geometry::{minimum_bounding_box, node_transform, world_outline, world_transform, Obb};
pub use patch::{diff_elements, ElementPatch, StylePatch, TextStylePatch, TransformPatch};
pub use store::{DocumentStore, MemoryStore, StoreSnapshot, Subscription};
pub use viewport::{SnappingConfig, ViewportConfig, ViewportController, ViewportState};
